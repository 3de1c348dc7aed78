//! Errors reported to the task creation and teardown collaborators.
//!
//! Selection and dispatch never fail; only the operations that add or
//! remove tasks from the registry can be refused.

use core::fmt;

/// Scheduler result type.
pub type Result<T> = core::result::Result<T, SchedError>;

/// Reasons a collaborator request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// A task was created with priority 0. The aging pass could never
    /// lift such a task's counter above zero.
    ZeroPriority,
    /// Every registry slot is occupied.
    RegistryFull,
    /// Slot index is outside the registry.
    InvalidSlot(usize),
    /// Slot holds no task.
    VacantSlot(usize),
    /// The request would remove or terminate the sentinel in slot 0.
    SentinelTask,
    /// The task in this slot is current and cannot be reaped.
    TaskIsCurrent(usize),
    /// The task in this slot has not exited yet.
    TaskStillRunnable(usize),
    /// The kernel API was used before `kernel::init()`.
    NotStarted,
    /// `kernel::init()` was called twice.
    AlreadyInitialized,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::ZeroPriority => write!(f, "task priority must be positive"),
            SchedError::RegistryFull => write!(f, "task registry is full"),
            SchedError::InvalidSlot(slot) => write!(f, "slot {} is out of range", slot),
            SchedError::VacantSlot(slot) => write!(f, "slot {} is empty", slot),
            SchedError::SentinelTask => write!(f, "the init task cannot be removed"),
            SchedError::TaskIsCurrent(slot) => write!(f, "task {} is currently running", slot),
            SchedError::TaskStillRunnable(slot) => write!(f, "task {} has not exited", slot),
            SchedError::NotStarted => write!(f, "kernel is not initialized"),
            SchedError::AlreadyInitialized => write!(f, "kernel is already initialized"),
        }
    }
}
