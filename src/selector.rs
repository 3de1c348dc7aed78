//! # Priority Selector
//!
//! Picks the next task to dispatch.
//!
//! ## Algorithm
//!
//! 1. Scan occupied slots in index order and keep the runnable task with
//!    the largest counter. Only a strictly larger counter replaces the
//!    current best, so the lowest index wins ties.
//! 2. If the best counter is positive, that task is selected.
//! 3. Otherwise age every occupied task, runnable or not:
//!    `counter = (counter >> 1) + priority`, and scan again.
//!
//! Each aging pass halves whatever a task had left and tops it up by its
//! static priority, so a task that keeps waiting climbs towards
//! `2 * priority - 1` while one that just ran restarts from its priority.
//!
//! ## Precondition
//!
//! At least one runnable task with a positive priority must be occupied,
//! otherwise the loop never terminates. The scheduler guarantees this
//! structurally: the sentinel in slot 0 is always runnable and every
//! [`Priority`](crate::task::Priority) is non-zero. Nothing here checks it.

use log::trace;

use crate::registry::TaskRegistry;

/// Outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Slot of the chosen task.
    pub slot: usize,
    /// Aging passes needed before a positive counter appeared.
    pub aging_passes: u32,
}

/// Runnable task with the largest counter, lowest index on ties.
///
/// Returns `None` only when nothing is runnable.
pub fn best_candidate<C, const N: usize>(registry: &TaskRegistry<C, N>) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (slot, task) in registry.iter() {
        if !task.is_runnable() {
            continue;
        }
        match best {
            Some((_, counter)) if task.counter <= counter => {}
            _ => best = Some((slot, task.counter)),
        }
    }
    best
}

/// Recharge the counter of every occupied slot.
pub fn age_all<C, const N: usize>(registry: &mut TaskRegistry<C, N>) {
    for (_, task) in registry.iter_mut() {
        task.age();
    }
}

/// Choose the next task, aging counters until a runnable task has a
/// positive counter.
///
/// See the module-level precondition: this does not return if no task is
/// runnable.
pub fn select<C, const N: usize>(registry: &mut TaskRegistry<C, N>) -> Selection {
    let mut aging_passes = 0;
    loop {
        if let Some((slot, counter)) = best_candidate(registry) {
            if counter > 0 {
                return Selection { slot, aging_passes };
            }
        }

        age_all(registry);
        aging_passes += 1;
        trace!("aging pass {} over {} tasks", aging_passes, registry.len());
    }
}
