//! # agesched
//!
//! A single-CPU preemptive task scheduler for a minimal ARM Cortex-M4
//! kernel, built around a counter-aging priority rule.
//!
//! ## Overview
//!
//! Every task carries a static `priority` and a dynamic `counter` (its
//! remaining quantum). On each reschedule the running task's counter drops
//! to zero and the runnable task with the largest counter is dispatched,
//! lowest slot first on ties. When no runnable task has a positive counter,
//! every task is aged with `counter = counter / 2 + priority` and the scan
//! repeats. A sentinel init task in slot 0 is always runnable, so the loop
//! always ends.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Application Tasks                      │
//! ├────────────────────────────────────────────────────────┤
//! │              Kernel API (kernel.rs)                     │
//! │  init() · create_task() · start() · reschedule()       │
//! │  schedule_tail() · exit_task() · reap_task()           │
//! ├──────────────────────────────┬─────────────────────────┤
//! │  Scheduler (scheduler.rs)    │  Sync / Logger          │
//! │  ─ reschedule()              │  sync.rs · logger.rs    │
//! │  ─ switch_to()               │                         │
//! │  ─ tick() · spawn · reap     │                         │
//! ├──────────────────────────────┴─────────────────────────┤
//! │  Priority Selector (selector.rs)                        │
//! │    best_candidate() · age_all() · select()              │
//! ├────────────────────────────────────────────────────────┤
//! │  Task Registry (registry.rs) · Task (task.rs)           │
//! ├────────────────────────────────────────────────────────┤
//! │  ContextSwitch (arch/mod.rs)                            │
//! │    arch/cortex_m4.rs: PendSV · SysTick · stack frames   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduler core (`task`, `registry`, `selector`, `scheduler`) is
//! architecture-neutral and tested on the host with a recording
//! [`arch::ContextSwitch`]. `kernel`, `sync`, `logger` and the Cortex-M4
//! port are only built for bare-metal ARM.
//!
//! ## Memory Model
//!
//! - **No heap**: the registry is a fixed `[Option<Task>; MAX_TASKS]`
//! - **Static stacks**: one `STACK_SIZE` stack per slot in the port layer
//! - **No locks**: exclusion comes from critical sections around every
//!   kernel entry point

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod selector;
pub mod task;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod kernel;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod logger;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod sync;

pub use error::{Result, SchedError};
pub use scheduler::Scheduler;
pub use task::{Priority, Task, TaskConfig, TaskState};
