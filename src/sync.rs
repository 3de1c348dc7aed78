//! # Synchronization
//!
//! The scheduler takes no locks: exclusion comes from running every
//! scheduling call with interrupts disabled. This wrapper is the one way
//! the kernel does that.

use cortex_m::interrupt::{self, CriticalSection};

/// Run `f` with interrupts disabled, restoring the previous state after.
///
/// A reschedule requested inside `f` only pends PendSV; the actual switch
/// happens once interrupts come back on at the end of the section.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    interrupt::free(f)
}
