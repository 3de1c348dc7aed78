//! # Configuration
//!
//! Compile-time constants governing the scheduler and the Cortex-M4 port.
//! All limits are fixed at compile time; nothing is allocated.

use log::LevelFilter;

/// Capacity of the task registry. Slot 0 is permanently held by the
/// sentinel init task, so at most `MAX_TASKS - 1` tasks can be spawned.
/// Each slot also owns a `STACK_SIZE` stack in the Cortex-M4 port.
pub const MAX_TASKS: usize = 16;

/// Per-task stack size in bytes. Must cover the deepest call chain plus
/// the hardware exception frame (32 bytes) and the software-saved
/// R4–R11 (32 bytes).
pub const STACK_SIZE: usize = 1024;

/// SysTick frequency in Hz. One tick consumes one unit of the running
/// task's counter, so a priority of `p` buys roughly `p` ticks per round.
pub const TICK_HZ: u32 = 100;

/// System clock frequency in Hz (STM32F4 16 MHz HSI after reset).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Static priority of the sentinel init task in slot 0.
pub const INIT_TASK_PRIORITY: u32 = 1;

/// Maximum level emitted by the ITM logger.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;
