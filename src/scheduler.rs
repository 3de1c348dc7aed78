//! # Scheduler
//!
//! The scheduler context object: it owns the task registry, the index of
//! the current task, and the context-switch backend. Every scheduling
//! operation goes through `&mut Scheduler`, so there is exactly one writer
//! of the registry and of `current` at any time.
//!
//! ## Dispatch
//!
//! ```text
//! reschedule()
//!   ├─► current.counter = 0
//!   ├─► selector::select()      ← may run aging passes
//!   └─► switch_to(next)
//!         ├─► next == current → return
//!         └─► current = next; arch.switch(prev, next)
//! ```
//!
//! ## Concurrency
//!
//! Nothing here takes a lock. Callers (the timer interrupt, the syscall
//! return path, a voluntary yield) must run with interrupts disabled for
//! the whole call; see `kernel.rs` for the Cortex-M4 wiring.

use log::{debug, info, warn};

use crate::arch::ContextSwitch;
use crate::error::{Result, SchedError};
use crate::registry::{TaskRegistry, SENTINEL_SLOT};
use crate::selector;
use crate::task::{Task, TaskConfig, TaskState};

/// Scheduler state for a single CPU with `N` task slots.
pub struct Scheduler<A: ContextSwitch, const N: usize> {
    registry: TaskRegistry<A::Context, N>,
    current: usize,
    arch: A,
}

impl<A: ContextSwitch, const N: usize> Scheduler<A, N> {
    /// Create a scheduler whose sentinel init task sits in slot 0 and is
    /// current. `init_context` is whatever the backend needs to enter the
    /// sentinel the first time; it is overwritten by the first switch away.
    pub fn new(arch: A, init: TaskConfig, init_context: A::Context) -> Self {
        Self {
            registry: TaskRegistry::with_sentinel(Task::new(init, init_context)),
            current: SENTINEL_SLOT,
            arch,
        }
    }

    /// Slot of the task whose context is on the CPU.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_task(&self) -> &Task<A::Context> {
        // `current` always names an occupied slot: the sentinel is never
        // removed and `reap` refuses the current slot.
        match self.registry.get(self.current) {
            Some(task) => task,
            None => unreachable!("current slot {} is vacant", self.current),
        }
    }

    fn current_task_mut(&mut self) -> &mut Task<A::Context> {
        let current = self.current;
        match self.registry.get_mut(current) {
            Some(task) => task,
            None => unreachable!("current slot {} is vacant", current),
        }
    }

    pub fn registry(&self) -> &TaskRegistry<A::Context, N> {
        &self.registry
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }

    // -----------------------------------------------------------------------
    // Dispatcher
    // -----------------------------------------------------------------------

    /// Give up the CPU and run the task with the best counter.
    ///
    /// The current task's counter drops to 0 first, so it only wins again
    /// if an aging pass lifts it above every other runnable task. When a
    /// different task is chosen this call returns only after the caller
    /// has been dispatched again, possibly many rounds later.
    ///
    /// # Precondition
    ///
    /// Interrupts must be disabled and no other scheduling call may be in
    /// flight. Selection terminates because the sentinel is always
    /// runnable with a positive priority.
    pub fn reschedule(&mut self) {
        self.current_task_mut().counter = 0;
        let selection = selector::select(&mut self.registry);
        self.switch_to(selection.slot);
    }

    /// Make `next` the current task and transfer the CPU to it.
    ///
    /// A no-op when `next` is already current. This is the only place
    /// `current` changes.
    pub fn switch_to(&mut self, next: usize) {
        if next == self.current {
            return;
        }
        let prev = self.current;
        let Some((prev_task, next_task)) = self.registry.pair_mut(prev, next) else {
            warn!("switch to vacant slot {} ignored", next);
            return;
        };
        let prev_ctx = prev_task.context_ptr();
        let next_ctx = next_task.context_ptr();

        self.current = next;
        debug!("switch {} -> {}", prev, next);
        // SAFETY: both contexts live in distinct occupied registry slots,
        // which are not freed while the tasks exist; exclusion is the
        // caller's precondition.
        unsafe { self.arch.switch(prev_ctx, next_ctx) };
    }

    /// Hook run by a freshly created task on its first dispatch, before
    /// its entry function. Performs no bookkeeping of its own.
    #[inline]
    pub fn schedule_tail(&mut self) {}

    // -----------------------------------------------------------------------
    // Quantum accounting
    // -----------------------------------------------------------------------

    /// Charge one timer tick to the current task.
    ///
    /// Returns `true` once its counter is exhausted and a reschedule is
    /// due.
    pub fn tick(&mut self) -> bool {
        let task = self.current_task_mut();
        task.counter = task.counter.saturating_sub(1);
        task.counter == 0
    }

    // -----------------------------------------------------------------------
    // Creation / teardown collaborators
    // -----------------------------------------------------------------------

    /// Add a runnable task in the lowest free slot.
    ///
    /// `context` builds the initial saved context for the chosen slot.
    pub fn spawn_with<F>(&mut self, config: TaskConfig, context: F) -> Result<usize>
    where
        F: FnOnce(usize) -> A::Context,
    {
        let slot = self
            .registry
            .insert_with(|slot| Task::new(config, context(slot)))
            .inspect_err(|e| warn!("spawn refused: {}", e))?;
        info!(
            "spawned task {} (priority {}, counter {})",
            slot,
            config.priority.get(),
            config.initial_counter()
        );
        Ok(slot)
    }

    /// Mark the current task as exited and hand the CPU to someone else.
    ///
    /// On a real CPU this does not return: a zombie is never selected
    /// again.
    pub fn exit_current(&mut self) -> Result<()> {
        if self.current == SENTINEL_SLOT {
            warn!("init task attempted to exit");
            return Err(SchedError::SentinelTask);
        }
        info!("task {} exited", self.current);
        self.current_task_mut().state = TaskState::Zombie;
        self.reschedule();
        Ok(())
    }

    /// Free the slot of an exited task and return it.
    pub fn reap(&mut self, slot: usize) -> Result<Task<A::Context>> {
        if slot == SENTINEL_SLOT {
            return Err(SchedError::SentinelTask);
        }
        if slot == self.current {
            return Err(SchedError::TaskIsCurrent(slot));
        }
        match self.registry.get(slot) {
            Some(task) if task.is_runnable() => return Err(SchedError::TaskStillRunnable(slot)),
            Some(_) => {}
            None if slot < N => return Err(SchedError::VacantSlot(slot)),
            None => return Err(SchedError::InvalidSlot(slot)),
        }
        let task = self.registry.remove(slot)?;
        info!("reaped task {}", slot);
        Ok(task)
    }

    /// Reap every exited task. Returns how many slots were freed.
    pub fn reap_zombies(&mut self) -> usize {
        let mut reaped = 0;
        for slot in 0..N {
            let exited = matches!(self.registry.get(slot), Some(t) if t.state == TaskState::Zombie);
            if exited && self.reap(slot).is_ok() {
                reaped += 1;
            }
        }
        reaped
    }

    /// Fill an empty global scheduler slot.
    ///
    /// `build` only runs once `slot` is known to be empty, so a repeated
    /// initialisation leaves the installed scheduler and everything its
    /// tasks own (stacks included) untouched.
    pub fn install<F>(slot: &mut Option<Self>, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<Self>,
    {
        if slot.is_some() {
            warn!("scheduler already installed");
            return Err(SchedError::AlreadyInitialized);
        }
        *slot = Some(build()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    /// Saved context for the host: just the owning slot, plus how many
    /// times it was saved and restored.
    #[derive(Debug, Default)]
    struct FakeContext {
        id: usize,
        saves: u32,
        restores: u32,
    }

    /// Records every transfer instead of touching registers.
    #[derive(Default)]
    struct RecordingSwitch {
        switches: Vec<(usize, usize)>,
    }

    unsafe impl ContextSwitch for RecordingSwitch {
        type Context = FakeContext;

        unsafe fn switch(&mut self, prev: *mut FakeContext, next: *mut FakeContext) {
            let (prev, next) = unsafe { (&mut *prev, &mut *next) };
            prev.saves += 1;
            next.restores += 1;
            self.switches.push((prev.id, next.id));
        }
    }

    fn config(priority: u32, counter: u32) -> TaskConfig {
        TaskConfig::new(Priority::new(priority).unwrap()).with_counter(counter)
    }

    /// Scheduler with slot `i` holding `tasks[i] = (priority, counter)`;
    /// slot 0 is the sentinel and is current.
    fn scheduler(tasks: &[(u32, u32)]) -> Scheduler<RecordingSwitch, 8> {
        let (p, c) = tasks[0];
        let mut s = Scheduler::new(RecordingSwitch::default(), config(p, c), FakeContext::default());
        for &(p, c) in &tasks[1..] {
            s.spawn_with(config(p, c), |id| FakeContext { id, ..Default::default() })
                .unwrap();
        }
        s
    }

    fn counters(s: &Scheduler<RecordingSwitch, 8>) -> Vec<u32> {
        s.registry().iter().map(|(_, t)| t.counter).collect()
    }

    #[test]
    fn test_reschedule_zeroes_current_then_picks_max() {
        let mut s = scheduler(&[(1, 5), (1, 5), (1, 0)]);
        s.reschedule();
        assert_eq!(counters(&s), vec![0, 5, 0]);
        assert_eq!(s.current(), 1);
        assert_eq!(s.arch().switches, vec![(0, 1)]);
    }

    #[test]
    fn test_reschedule_ages_when_all_counters_zero() {
        let mut s = scheduler(&[(4, 0), (2, 0), (6, 0)]);
        s.reschedule();
        assert_eq!(counters(&s), vec![4, 2, 6]);
        assert_eq!(s.current(), 2);
        assert_eq!(s.arch().switches, vec![(0, 2)]);
    }

    #[test]
    fn test_lone_sentinel_reselects_itself_without_switching() {
        let mut s = scheduler(&[(1, 0)]);
        s.reschedule();
        assert_eq!(counters(&s), vec![1]);
        assert_eq!(s.current(), 0);
        assert!(s.arch().switches.is_empty());
    }

    #[test]
    fn test_reschedule_zeroes_current_even_if_reselected() {
        // Task 1 is current with a huge counter; it still drops to 0 first
        let mut s = scheduler(&[(1, 0), (3, 100), (1, 0)]);
        s.switch_to(1);
        s.reschedule();
        // One aging pass from all-zero gives [1, 3, 1]
        assert_eq!(counters(&s), vec![1, 3, 1]);
        assert_eq!(s.current(), 1);
        assert_eq!(s.arch().switches, vec![(0, 1)]);
    }

    #[test]
    fn test_switch_to_current_is_a_no_op() {
        let mut s = scheduler(&[(1, 0), (2, 2)]);
        s.switch_to(0);
        assert_eq!(s.current(), 0);
        assert!(s.arch().switches.is_empty());
        assert_eq!(s.current_task().context().saves, 0);
    }

    #[test]
    fn test_switch_saves_prev_and_restores_next() {
        let mut s = scheduler(&[(1, 0), (2, 2), (2, 2)]);
        s.switch_to(2);
        s.switch_to(1);
        assert_eq!(s.arch().switches, vec![(0, 2), (2, 1)]);
        let reg = s.registry();
        assert_eq!(reg.get(0).unwrap().context().saves, 1);
        assert_eq!(reg.get(2).unwrap().context().restores, 1);
        assert_eq!(reg.get(2).unwrap().context().saves, 1);
        assert_eq!(reg.get(1).unwrap().context().restores, 1);
    }

    #[test]
    fn test_switch_to_vacant_slot_is_ignored() {
        let mut s = scheduler(&[(1, 0), (2, 2)]);
        s.switch_to(5);
        s.switch_to(42);
        assert_eq!(s.current(), 0);
        assert!(s.arch().switches.is_empty());
    }

    #[test]
    fn test_tick_drains_quantum() {
        let mut s = scheduler(&[(1, 0), (2, 3)]);
        s.switch_to(1);
        assert!(!s.tick());
        assert!(!s.tick());
        assert!(s.tick());
        // Already empty: stays at zero and keeps asking for a reschedule
        assert!(s.tick());
        assert_eq!(s.current_task().counter, 0);
    }

    #[test]
    fn test_round_robin_of_equal_priorities() {
        let mut s = scheduler(&[(1, 0), (2, 2), (2, 2)]);
        let mut order = Vec::new();
        for _ in 0..6 {
            while !s.tick() {}
            s.reschedule();
            order.push(s.current());
        }
        assert_eq!(order, vec![1, 2, 1, 2, 0, 1]);
    }

    #[test]
    fn test_spawn_defaults_counter_to_priority() {
        let mut s = scheduler(&[(1, 0)]);
        let slot = s
            .spawn_with(TaskConfig::new(Priority::new(6).unwrap()), |id| FakeContext {
                id,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(slot, 1);
        let task = s.registry().get(slot).unwrap();
        assert_eq!(task.counter, 6);
        assert!(task.is_runnable());
        assert_eq!(task.context().id, 1);
    }

    #[test]
    fn test_spawn_into_full_registry() {
        let mut s = scheduler(&[(1, 0); 8]);
        let err = s.spawn_with(config(1, 1), |_| FakeContext::default());
        assert_eq!(err, Err(SchedError::RegistryFull));
    }

    #[test]
    fn test_exit_and_reap() {
        let mut s = scheduler(&[(1, 0), (2, 5), (2, 0)]);
        s.switch_to(1);
        assert_eq!(s.reap(1).err(), Some(SchedError::TaskIsCurrent(1)));
        assert_eq!(s.reap(2).err(), Some(SchedError::TaskStillRunnable(2)));

        s.exit_current().unwrap();
        assert_eq!(s.registry().get(1).unwrap().state, TaskState::Zombie);
        assert_ne!(s.current(), 1);

        let task = s.reap(1).unwrap();
        assert_eq!(task.context().id, 1);
        assert!(s.registry().get(1).is_none());
        assert_eq!(s.registry().len(), 2);

        assert_eq!(s.reap(1).err(), Some(SchedError::VacantSlot(1)));
        assert_eq!(s.reap(99).err(), Some(SchedError::InvalidSlot(99)));
    }

    #[test]
    fn test_sentinel_cannot_exit_or_be_reaped() {
        let mut s = scheduler(&[(1, 0), (2, 5)]);
        assert_eq!(s.exit_current(), Err(SchedError::SentinelTask));
        assert!(s.current_task().is_runnable());

        s.switch_to(1);
        assert_eq!(s.reap(0).err(), Some(SchedError::SentinelTask));
    }

    #[test]
    fn test_reap_zombies_frees_exited_slots() {
        let mut s = scheduler(&[(1, 0), (2, 5), (2, 4), (2, 3)]);
        s.switch_to(1);
        s.exit_current().unwrap();
        s.switch_to(3);
        s.exit_current().unwrap();
        assert_eq!(s.registry().len(), 4);

        s.switch_to(0);
        assert_eq!(s.reap_zombies(), 2);
        let slots: Vec<usize> = s.registry().iter().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![0, 2]);
        assert_eq!(s.reap_zombies(), 0);
    }

    #[test]
    fn test_install_into_empty_slot() {
        let mut slot = None;
        Scheduler::install(&mut slot, || Ok(scheduler(&[(1, 0), (2, 2)]))).unwrap();
        assert_eq!(slot.as_ref().map(|s| s.registry().len()), Some(2));
    }

    #[test]
    fn test_second_install_never_builds() {
        let mut slot = Some(scheduler(&[(1, 0), (2, 2)]));
        let mut built = false;
        let result = Scheduler::install(&mut slot, || {
            built = true;
            Ok(scheduler(&[(1, 0)]))
        });
        assert_eq!(result, Err(SchedError::AlreadyInitialized));
        assert!(!built);
        // The installed scheduler is unchanged
        let s = slot.unwrap();
        assert_eq!(s.registry().len(), 2);
        assert_eq!(s.registry().get(0).unwrap().context().restores, 0);
    }

    #[test]
    fn test_failed_build_leaves_slot_empty() {
        let mut slot: Option<Scheduler<RecordingSwitch, 8>> = None;
        let result = Scheduler::install(&mut slot, || Err(SchedError::ZeroPriority));
        assert_eq!(result, Err(SchedError::ZeroPriority));
        assert!(slot.is_none());
    }

    #[test]
    fn test_zombie_never_dispatched() {
        let mut s = scheduler(&[(1, 0), (9, 9), (1, 1)]);
        s.switch_to(1);
        s.exit_current().unwrap();
        for _ in 0..20 {
            s.reschedule();
            assert_ne!(s.current(), 1);
        }
    }
}
