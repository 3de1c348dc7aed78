//! # Task
//!
//! The per-task scheduling metadata. The scheduler reads and writes only
//! `state` and `counter`; `priority` is fixed at creation and the saved
//! context is opaque, meaningful only to the [`ContextSwitch`] backend.
//!
//! [`ContextSwitch`]: crate::arch::ContextSwitch

use core::num::NonZeroU32;

use crate::error::{Result, SchedError};

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Execution state of a task as seen by the scheduler.
///
/// ```text
///   spawn()        ┌─────────┐   exit_current()   ┌────────┐   reap()
///  ──────────────► │ Running │ ─────────────────► │ Zombie │ ─────────► (slot freed)
///                  └─────────┘                    └────────┘
/// ```
///
/// There is no blocked state: a `Running` task is either on the CPU or
/// ready to be picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Running or ready to run. The only state the selector considers.
    Running,
    /// Exited; waiting for its slot to be reaped.
    Zombie,
}

// ---------------------------------------------------------------------------
// Static priority
// ---------------------------------------------------------------------------

/// Static scheduling weight, added to the counter on every aging pass.
///
/// Always positive: a zero priority would let the aging loop spin forever
/// on a registry whose only runnable task has a zero counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(NonZeroU32);

impl Priority {
    /// Validate a raw priority.
    pub const fn new(value: u32) -> Result<Self> {
        match NonZeroU32::new(value) {
            Some(p) => Ok(Priority(p)),
            None => Err(SchedError::ZeroPriority),
        }
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

// ---------------------------------------------------------------------------
// Creation parameters
// ---------------------------------------------------------------------------

/// Parameters supplied by the task creation collaborator.
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    /// Static priority (the aging increment).
    pub priority: Priority,
    /// Initial counter. `None` starts the task with a full quantum equal to
    /// its priority.
    pub counter: Option<u32>,
}

impl TaskConfig {
    pub const fn new(priority: Priority) -> Self {
        Self { priority, counter: None }
    }

    /// Start with an explicit counter instead of the default quantum.
    pub const fn with_counter(mut self, counter: u32) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Counter the task starts with.
    #[inline]
    pub const fn initial_counter(&self) -> u32 {
        match self.counter {
            Some(c) => c,
            None => self.priority.get(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One schedulable unit of execution.
///
/// `C` is the architecture's saved-context type. The scheduler never looks
/// inside it; it only hands pointers to it to the context-switch backend.
#[derive(Debug)]
pub struct Task<C> {
    /// Runnable or exited.
    pub state: TaskState,
    /// Dynamic priority / remaining quantum. Reset to 0 when the task
    /// gives up the CPU, recharged by aging passes.
    pub counter: u32,
    priority: Priority,
    context: C,
}

impl<C> Task<C> {
    /// Create a runnable task from its creation parameters and initial
    /// context.
    pub fn new(config: TaskConfig, context: C) -> Self {
        Self {
            state: TaskState::Running,
            counter: config.initial_counter(),
            priority: config.priority,
            context,
        }
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Whether the selector may pick this task.
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Recharge the counter: halve it, then add the static priority.
    ///
    /// Repeated aging converges on `2 * priority - 1` from below for a task
    /// that never runs, so long-waiting high-priority tasks win eventually.
    #[inline]
    pub fn age(&mut self) {
        self.counter = (self.counter >> 1).saturating_add(self.priority.get());
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Raw pointer to the saved context, for the context-switch backend.
    pub(crate) fn context_ptr(&mut self) -> *mut C {
        &mut self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prio(p: u32) -> Priority {
        Priority::new(p).unwrap()
    }

    #[test]
    fn test_zero_priority_rejected() {
        assert_eq!(Priority::new(0), Err(SchedError::ZeroPriority));
        assert_eq!(Priority::new(7).map(Priority::get), Ok(7));
    }

    #[test]
    fn test_new_task_is_runnable_with_full_quantum() {
        let task = Task::new(TaskConfig::new(prio(5)), ());
        assert_eq!(task.state, TaskState::Running);
        assert!(task.is_runnable());
        assert_eq!(task.counter, 5);
        assert_eq!(task.priority().get(), 5);
    }

    #[test]
    fn test_explicit_initial_counter() {
        let task = Task::new(TaskConfig::new(prio(3)).with_counter(0), ());
        assert_eq!(task.counter, 0);
    }

    #[test]
    fn test_zombie_is_not_runnable() {
        let mut task = Task::new(TaskConfig::new(prio(1)), ());
        task.state = TaskState::Zombie;
        assert!(!task.is_runnable());
    }

    #[test]
    fn test_aging_halves_then_adds_priority() {
        let mut task = Task::new(TaskConfig::new(prio(4)).with_counter(0), ());
        task.age();
        assert_eq!(task.counter, 4);
        task.age();
        assert_eq!(task.counter, 6);
        task.age();
        assert_eq!(task.counter, 7);
        // Fixed point for priority 4
        task.age();
        assert_eq!(task.counter, 7);

        // Odd counters round toward zero before the add
        task.counter = 9;
        task.age();
        assert_eq!(task.counter, 8);
    }

    #[test]
    fn test_aging_saturates() {
        let mut task = Task::new(TaskConfig::new(prio(u32::MAX)).with_counter(u32::MAX), ());
        task.age();
        assert_eq!(task.counter, u32::MAX);
    }
}
