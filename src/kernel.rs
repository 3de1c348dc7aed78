//! # Kernel
//!
//! The global scheduler instance for the Cortex-M4 port and the public
//! kernel API built on it. Every entry point takes a critical section, so
//! the scheduler only ever has one caller.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()          ← logger, scheduler, init task in slot 0
//!         ├─► kernel::create_task()   ← register tasks (×N)
//!         └─► kernel::start()         ← SysTick, priorities, enter init task
//!               └─► init task: loop { reap zombies; reschedule(); wfi }
//! ```

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use log::{error, info, warn};

use crate::arch::cortex_m4::{self, CortexM4};
use crate::config::{INIT_TASK_PRIORITY, MAX_TASKS};
use crate::error::{Result, SchedError};
use crate::logger;
use crate::registry::SENTINEL_SLOT;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::{Priority, TaskConfig};

/// Scheduler type used by the kernel.
pub type KernelScheduler = Scheduler<CortexM4, MAX_TASKS>;

/// The one scheduler. `None` until [`init`] runs.
static SCHEDULER: Mutex<RefCell<Option<KernelScheduler>>> = Mutex::new(RefCell::new(None));

/// Run `f` on the scheduler with interrupts disabled.
fn with_scheduler<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&mut KernelScheduler) -> R,
{
    sync::critical_section(|cs| {
        let mut scheduler = SCHEDULER.borrow(cs).borrow_mut();
        scheduler.as_mut().map(f).ok_or(SchedError::NotStarted)
    })
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Install the logger and create the scheduler with the init task in
/// slot 0.
pub fn init() -> Result<()> {
    if logger::init().is_err() {
        // Someone else installed a logger first; keep theirs.
        warn!("logger already installed");
    }

    sync::critical_section(|cs| {
        let mut scheduler = SCHEDULER.borrow(cs).borrow_mut();
        // Slot 0's stack is only written once the slot is known to be free.
        KernelScheduler::install(&mut scheduler, || {
            let init = TaskConfig::new(Priority::new(INIT_TASK_PRIORITY)?).with_counter(0);
            let context = cortex_m4::init_context(SENTINEL_SLOT, init_task);
            Ok(Scheduler::new(CortexM4, init, context))
        })
    })?;

    info!("scheduler ready: {} slots", MAX_TASKS);
    Ok(())
}

/// Create a task with the given static priority.
///
/// It starts runnable with a full quantum (counter = priority). Returns
/// its slot.
pub fn create_task(entry: extern "C" fn() -> !, priority: u32) -> Result<usize> {
    let config = TaskConfig::new(Priority::new(priority)?);
    with_scheduler(|s| s.spawn_with(config, |slot| cortex_m4::init_context(slot, entry)))?
}

/// Start scheduling. **Does not return.**
///
/// Configures SysTick and the handler priorities, then enters the init
/// task on its process stack. The init task hands the CPU to the other
/// tasks on its first reschedule.
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    cortex_m::interrupt::disable();

    cortex_m4::configure_systick(&mut core_peripherals.SYST);
    cortex_m4::set_interrupt_priorities(&mut core_peripherals.SCB);

    let first = with_scheduler(|s| s.current_task().context().stack_pointer());
    let Ok(sp) = first else {
        error!("start() called before init()");
        loop {
            cortex_m::asm::wfi();
        }
    };

    info!("starting init task");
    // SAFETY: Thread mode on MSP with interrupts off; `sp` is the frame
    // `init_context` built for slot 0, and slot 0 never goes away.
    unsafe { cortex_m4::start_first_task(sp) }
}

/// Give up the CPU to the task with the best counter.
///
/// Callable from Thread mode (voluntary yield) and from exception
/// handlers. The switch itself happens when PendSV runs, right after the
/// critical section ends; a yielding task resumes from here once it is
/// selected again.
pub fn reschedule() {
    if with_scheduler(KernelScheduler::reschedule).is_err() {
        warn!("reschedule before init");
    }
}

/// Post-switch hook, run by every task on its first dispatch.
pub fn schedule_tail() {
    if let Err(e) = with_scheduler(KernelScheduler::schedule_tail) {
        warn!("schedule_tail: {}", e);
    }
}

/// Terminate the calling task. **Does not return.**
///
/// The task becomes a zombie and its slot is freed by the init task.
pub fn exit_task() -> ! {
    if let Err(e) = with_scheduler(KernelScheduler::exit_current).and_then(|r| r) {
        error!("exit_task: {}", e);
    }
    // Unreachable for a real exit: PendSV switches away and a zombie is
    // never selected again.
    loop {
        cortex_m::asm::wfi();
    }
}

/// Free the slot of an exited task.
pub fn reap_task(slot: usize) -> Result<()> {
    with_scheduler(|s| s.reap(slot).map(drop))?
}

/// Slot of the running task.
pub fn current_task() -> Result<usize> {
    with_scheduler(|s| s.current())
}

// ---------------------------------------------------------------------------
// Init task
// ---------------------------------------------------------------------------

/// Body of the sentinel in slot 0: clean up exited tasks, hand the CPU
/// over, and sleep when nothing else wants it.
extern "C" fn init_task() -> ! {
    loop {
        if let Err(e) = with_scheduler(KernelScheduler::reap_zombies) {
            warn!("init task: {}", e);
        }
        reschedule();
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler: charge one tick to the running task and
/// reschedule once its quantum is spent.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let ticked = with_scheduler(|s| {
        if s.tick() {
            s.reschedule();
        }
    });
    if let Err(e) = ticked {
        warn!("SysTick: {}", e);
    }
}
