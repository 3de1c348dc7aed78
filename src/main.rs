//! # agesched Demo Firmware
//!
//! Four tasks showing how priority turns into CPU share under counter
//! aging:
//!
//! | Task | Priority | Behavior |
//! |------|----------|----------|
//! | `cpu_bound_task` | 1 | Busy-loops; preempted when its quantum runs out |
//! | `sensor_task` | 4 | Short burst of work, then yields |
//! | `background_task` | 2 | Busy-loops with a longer quantum than `cpu_bound_task` |
//! | `one_shot_task` | 3 | Runs a fixed amount of work, then exits |
//!
//! ## Expected Dynamics
//!
//! 1. `sensor_task` starts with the largest counter and runs first.
//! 2. Each yield or expired quantum zeroes the running counter; when every
//!    runnable counter is zero the aging pass refills them in proportion
//!    to priority.
//! 3. `one_shot_task` exits; the init task reaps its slot on its next turn.
//!
//! Watch the `switch` / `spawned` / `exited` lines on ITM port 0 at the
//! `debug` level.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use agesched::kernel;

extern "C" fn cpu_bound_task() -> ! {
    let mut counter: u32 = 0;
    loop {
        counter = counter.wrapping_add(1);
        core::hint::black_box(counter);
    }
}

extern "C" fn sensor_task() -> ! {
    loop {
        let mut sample: u32 = 0;
        for i in 0..2_000u32 {
            sample = sample.wrapping_add(i);
        }
        core::hint::black_box(sample);
        kernel::reschedule();
    }
}

extern "C" fn background_task() -> ! {
    let mut acc: u64 = 0;
    loop {
        acc = acc.wrapping_mul(31).wrapping_add(7);
        core::hint::black_box(acc);
    }
}

extern "C" fn one_shot_task() -> ! {
    let mut work: u32 = 0;
    for i in 0..50_000u32 {
        work = work.wrapping_add(i);
    }
    core::hint::black_box(work);
    kernel::exit_task()
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().expect("core peripherals taken once");

    kernel::init().expect("kernel init");

    kernel::create_task(cpu_bound_task, 1).expect("create cpu_bound_task");
    kernel::create_task(sensor_task, 4).expect("create sensor_task");
    kernel::create_task(background_task, 2).expect("create background_task");
    kernel::create_task(one_shot_task, 3).expect("create one_shot_task");

    kernel::start(cp)
}
