//! # Task Registry
//!
//! Fixed-capacity table of task slots. Slot indices are stable for the
//! lifetime of a task and are the tie-break order used by the selector.
//!
//! Slot 0 belongs to the sentinel init task for the whole life of the
//! system; [`TaskRegistry::remove`] refuses it.

use crate::error::{Result, SchedError};
use crate::task::Task;

/// Index of the sentinel init task.
pub const SENTINEL_SLOT: usize = 0;

/// Arena of `N` optional task slots.
pub struct TaskRegistry<C, const N: usize> {
    slots: [Option<Task<C>>; N],
    len: usize,
}

impl<C, const N: usize> TaskRegistry<C, N> {
    /// Create a registry holding only the sentinel task in slot 0.
    pub fn with_sentinel(sentinel: Task<C>) -> Self {
        const { assert!(N > 0, "the registry needs room for the sentinel") };
        let mut slots: [Option<Task<C>>; N] = core::array::from_fn(|_| None);
        slots[SENTINEL_SLOT] = Some(sentinel);
        Self { slots, len: 1 }
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: the sentinel is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn get(&self, slot: usize) -> Option<&Task<C>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Task<C>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Task<C>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, task)| task.as_ref().map(|t| (slot, t)))
    }

    /// Occupied slots in index order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Task<C>)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, task)| task.as_mut().map(|t| (slot, t)))
    }

    /// Lowest unoccupied slot, if any.
    pub fn vacant_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Build a task for the lowest free slot and store it there.
    ///
    /// The closure receives the slot index so the caller can set up
    /// per-slot resources (stack, initial frame) before the task becomes
    /// visible to the selector.
    pub fn insert_with<F>(&mut self, build: F) -> Result<usize>
    where
        F: FnOnce(usize) -> Task<C>,
    {
        let slot = self.vacant_slot().ok_or(SchedError::RegistryFull)?;
        self.slots[slot] = Some(build(slot));
        self.len += 1;
        Ok(slot)
    }

    /// Take the task out of `slot`, leaving it vacant.
    pub fn remove(&mut self, slot: usize) -> Result<Task<C>> {
        if slot == SENTINEL_SLOT {
            return Err(SchedError::SentinelTask);
        }
        let entry = self.slots.get_mut(slot).ok_or(SchedError::InvalidSlot(slot))?;
        let task = entry.take().ok_or(SchedError::VacantSlot(slot))?;
        self.len -= 1;
        Ok(task)
    }

    /// Mutable access to two distinct occupied slots at once.
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Task<C>, &mut Task<C>)> {
        if a == b || a >= N || b >= N {
            return None;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        let (head, tail) = self.slots.split_at_mut(hi);
        let lo_task = head[lo].as_mut()?;
        let hi_task = tail[0].as_mut()?;
        if a < b {
            Some((lo_task, hi_task))
        } else {
            Some((hi_task, lo_task))
        }
    }
}
