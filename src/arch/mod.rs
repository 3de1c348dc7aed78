//! # Architecture Abstraction Layer
//!
//! The scheduler core is architecture-neutral. The only thing it needs
//! from the hardware is [`ContextSwitch`]: save the running context,
//! restore another one. This trait is the crate's single unsafe boundary;
//! everything above it is safe code.
//!
//! The Cortex-M4 port lives in [`cortex_m4`] and is only built for
//! bare-metal ARM targets. [`frame`] and [`PendingSwitch`] hold the parts
//! of it that are plain data and build everywhere.

use core::ptr;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
pub mod frame;

/// Save-current / restore-target primitive.
///
/// # Safety
///
/// Implementations must save the executing context into `*prev` and resume
/// execution from `*next`: at the point where `next` last suspended, or at
/// its entry point if it has never run. When `prev != next` the call only
/// "returns" once `prev` is dispatched again.
pub unsafe trait ContextSwitch {
    /// Saved registers / stack pointer. Opaque to the scheduler.
    type Context;

    /// Transfer the CPU from `prev` to `next`.
    ///
    /// # Safety
    ///
    /// Both pointers must point to live contexts owned by the task
    /// registry, must not alias, and must stay valid until `prev` resumes.
    /// The caller must hold interrupts off so no other scheduling call
    /// interleaves with this one.
    unsafe fn switch(&mut self, prev: *mut Self::Context, next: *mut Self::Context);
}

/// A transfer requested but not yet carried out by a deferred switch
/// handler.
///
/// `prev` is the context whose registers are still live on the CPU, or null
/// when nothing is pending. Two requests before the handler runs (A→B,
/// then B→C) collapse into one: B never ran, so A is still what must be
/// saved, and C is what must be restored.
///
/// `prev` at offset 0 and `next` at one pointer width are read directly by
/// the PendSV handler.
#[repr(C)]
#[derive(Debug)]
pub struct PendingSwitch<C> {
    pub prev: *mut C,
    pub next: *mut C,
}

impl<C> PendingSwitch<C> {
    pub const fn new() -> Self {
        Self {
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Record a `prev → next` request, keeping an earlier unserviced `prev`.
    pub fn record(&mut self, prev: *mut C, next: *mut C) {
        if self.prev.is_null() {
            self.prev = prev;
        }
        self.next = next;
    }
}

impl<C> Default for PendingSwitch<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr_of(x: &mut u8) -> *mut u8 {
        x as *mut u8
    }

    #[test]
    fn test_pending_switch_starts_idle() {
        let pending = PendingSwitch::<u8>::new();
        assert!(pending.prev.is_null());
        assert!(pending.next.is_null());
    }

    #[test]
    fn test_single_request() {
        let (mut a, mut b) = (0u8, 1u8);
        let mut pending = PendingSwitch::new();
        pending.record(ptr_of(&mut a), ptr_of(&mut b));
        assert_eq!(pending.prev, ptr_of(&mut a));
        assert_eq!(pending.next, ptr_of(&mut b));
    }

    #[test]
    fn test_back_to_back_requests_keep_first_prev() {
        let (mut a, mut b, mut c) = (0u8, 1u8, 2u8);
        let mut pending = PendingSwitch::new();
        pending.record(ptr_of(&mut a), ptr_of(&mut b));
        pending.record(ptr_of(&mut b), ptr_of(&mut c));
        // A is still on the CPU; B's context was never live
        assert_eq!(pending.prev, ptr_of(&mut a));
        assert_eq!(pending.next, ptr_of(&mut c));
    }

    #[test]
    fn test_request_after_service_takes_new_prev() {
        let (mut a, mut b, mut c) = (0u8, 1u8, 2u8);
        let mut pending = PendingSwitch::new();
        pending.record(ptr_of(&mut a), ptr_of(&mut b));
        // The handler clears `prev` once it has saved it
        pending.prev = ptr::null_mut();
        pending.record(ptr_of(&mut b), ptr_of(&mut c));
        assert_eq!(pending.prev, ptr_of(&mut b));
        assert_eq!(pending.next, ptr_of(&mut c));
    }
}
