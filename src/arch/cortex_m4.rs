//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2, no FPU context).
//! Realises [`ContextSwitch`] with PendSV, configures SysTick, and lays out
//! the initial stack frame of new tasks.
//!
//! ## Context Switch Mechanism
//!
//! Tasks run in Thread mode on the process stack (PSP). On exception entry
//! the hardware stacks R0–R3, R12, LR, PC and xPSR; PendSV saves and
//! restores R4–R11 by hand, which completes the context.
//!
//! [`CortexM4::switch`] does not touch registers itself. It records the
//! pending `(prev, next)` pair and pends PendSV, which runs as soon as the
//! caller leaves its critical section:
//!
//! ```text
//! Scheduler::switch_to()          PendSV (lowest priority)
//!   ├─► PENDING.record(prev, next)  ├─► push R4–R11 on PSP, prev.sp = PSP
//!   └─► pend PendSV                 ├─► PSP = next.sp, pop R4–R11
//!                                   └─► exception return into next
//! ```
//!
//! If two switches happen before PendSV runs (A→B, then B→C), only the
//! first `prev` is kept; see [`PendingSwitch`].
//!
//! ## Interrupt Priorities
//!
//! PendSV and SysTick both run at 0xFF (lowest), so neither preempts the
//! other and a context switch never interrupts another handler.

use core::arch::{asm, global_asm};
use core::ptr::addr_of_mut;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::arch::frame::{self, FrameEntry};
use crate::arch::{ContextSwitch, PendingSwitch};
use crate::config::{MAX_TASKS, STACK_SIZE, SYSTEM_CLOCK_HZ, TICK_HZ};

// ---------------------------------------------------------------------------
// Saved context and task stacks
// ---------------------------------------------------------------------------

/// Saved state of a suspended task: its process stack pointer, pointing at
/// the software-saved R4–R11 just below the hardware exception frame.
///
/// `sp` must stay the first field; PendSV loads and stores it at offset 0.
#[repr(C)]
#[derive(Debug)]
pub struct CpuContext {
    sp: *mut u32,
}

// Safety: `sp` points into the owning slot's entry in `STACKS`, and
// contexts are only touched inside critical sections or by PendSV.
unsafe impl Send for CpuContext {}

impl CpuContext {
    #[inline]
    pub fn stack_pointer(&self) -> *mut u32 {
        self.sp
    }
}

const STACK_WORDS: usize = STACK_SIZE / 4;

/// Per-slot process stack, 8-byte aligned as AAPCS requires.
#[repr(C, align(8))]
struct TaskStack([u32; STACK_WORDS]);

/// One stack per registry slot; slot `i` always uses `STACKS[i]`.
static mut STACKS: [TaskStack; MAX_TASKS] = [const { TaskStack([0; STACK_WORDS]) }; MAX_TASKS];

/// Build the initial context for the task about to occupy `slot`: a
/// [`frame`] that enters `task_trampoline(entry)` and falls into
/// `task_exit` if `entry` ever returns.
///
/// # Panics
///
/// If `slot >= MAX_TASKS`; the registry never hands out such a slot.
pub fn init_context(slot: usize, entry: extern "C" fn() -> !) -> CpuContext {
    // SAFETY: the stack of `slot` is only used by the task occupying that
    // slot, which does not exist yet (or has been reaped).
    let stack = unsafe { &mut (*addr_of_mut!(STACKS))[slot].0 };
    let sp = frame::write_initial_frame(
        stack,
        FrameEntry {
            arg: entry as usize as u32,
            pc: task_trampoline as usize as u32,
            lr: task_exit as usize as u32,
        },
    );

    CpuContext { sp: stack[sp..].as_mut_ptr() }
}

/// First code a new task runs: the post-switch hook, then its entry.
extern "C" fn task_trampoline(entry: extern "C" fn() -> !) -> ! {
    crate::kernel::schedule_tail();
    entry()
}

/// Landing pad if an entry function ever returns.
extern "C" fn task_exit() -> ! {
    crate::kernel::exit_task()
}

// ---------------------------------------------------------------------------
// Context switch
// ---------------------------------------------------------------------------

/// Switch PendSV services next.
static mut PENDING: PendingSwitch<CpuContext> = PendingSwitch::new();

/// PendSV-based [`ContextSwitch`] backend.
#[derive(Debug, Default)]
pub struct CortexM4;

unsafe impl ContextSwitch for CortexM4 {
    type Context = CpuContext;

    unsafe fn switch(&mut self, prev: *mut CpuContext, next: *mut CpuContext) {
        // SAFETY: interrupts are off (caller precondition), so PendSV
        // cannot observe a half-written pair.
        unsafe { (*addr_of_mut!(PENDING)).record(prev, next) };
        SCB::set_pendsv();
    }
}

global_asm!(
    ".section .text.PendSV,\"ax\",%progbits",
    ".global PendSV",
    ".type PendSV,%function",
    ".thumb_func",
    "PendSV:",
    "    cpsid i",
    "    ldr r2, ={pending}",
    "    ldr r3, [r2]",
    "    cbz r3, .Lpendsv_done",
    // Save: R4–R11 below the hardware frame, PSP into prev.sp
    "    mrs r0, psp",
    "    stmdb r0!, {{r4-r11}}",
    "    str r0, [r3]",
    "    movs r1, #0",
    "    str r1, [r2]",
    // Restore: PSP from next.sp, then R4–R11
    "    ldr r3, [r2, #4]",
    "    ldr r0, [r3]",
    "    ldmia r0!, {{r4-r11}}",
    "    msr psp, r0",
    ".Lpendsv_done:",
    "    cpsie i",
    // LR still holds EXC_RETURN (Thread mode, PSP)
    "    bx lr",
    "    .ltorg",
    ".size PendSV, . - PendSV",
    pending = sym PENDING,
);

// ---------------------------------------------------------------------------
// SysTick and priorities
// ---------------------------------------------------------------------------

/// Configure SysTick to fire at `TICK_HZ` from the core clock.
pub fn configure_systick(syst: &mut SYST) {
    syst.set_reload(SYSTEM_CLOCK_HZ / TICK_HZ - 1);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Put PendSV and SysTick at the lowest priority.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // SAFETY: lowering these two handlers cannot break a priority-based
    // critical section; the kernel only uses PRIMASK.
    unsafe {
        scb.set_priority(SystemHandler::PendSV, 0xFF);
        scb.set_priority(SystemHandler::SysTick, 0xFF);
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch Thread mode to the process stack and enter the task whose saved
/// stack pointer is `sp`, which must point at a frame built by
/// [`init_context`].
///
/// # Safety
///
/// Call once, from Thread mode on the main stack, with interrupts
/// disabled. Never returns.
pub unsafe fn start_first_task(sp: *mut u32) -> ! {
    unsafe {
        asm!(
            // Skip the software-saved R4–R11; nothing to restore yet
            "adds r0, #32",
            "msr psp, r0",
            // CONTROL.SPSEL = 1: Thread mode uses PSP
            "movs r0, #2",
            "msr control, r0",
            "isb",
            // Unwind the hardware frame by hand
            "pop {{r0-r3, r12}}",
            "pop {{r4}}",
            "mov lr, r4",
            "pop {{r5}}",
            "pop {{r6}}",
            "cpsie i",
            "bx r5",
            in("r0") sp,
            options(noreturn)
        );
    }
}
