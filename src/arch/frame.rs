//! # Initial Exception Frame
//!
//! Layout of the stack a Cortex-M task starts from. The first dispatch
//! "returns" from an exception into it, so it mirrors what the hardware
//! and PendSV would have saved for a suspended task.
//!
//! ```text
//! word  register
//!  15   xPSR  (Thumb bit)
//!  14   PC    (first instruction)
//!  13   LR    (where a returning entry lands)
//!  12   R12
//! 9-11  R1–R3
//!   8   R0    (argument)
//! 0-7   R4–R11               <- saved stack pointer
//! ```

/// Words in the frame: 8 software-saved + 8 hardware-stacked.
pub const FRAME_WORDS: usize = 16;

/// Word offsets from the saved stack pointer.
pub const R0: usize = 8;
pub const LR: usize = 13;
pub const PC: usize = 14;
pub const XPSR: usize = 15;

/// Initial xPSR: only the Thumb bit set.
pub const XPSR_THUMB: u32 = 0x0100_0000;

/// Code addresses baked into a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    /// Loaded into R0, the first argument of `pc`.
    pub arg: u32,
    pub pc: u32,
    pub lr: u32,
}

/// Write a fresh frame at the top of `stack` and return the word index the
/// saved stack pointer must point at.
///
/// # Panics
///
/// If `stack` is shorter than [`FRAME_WORDS`].
pub fn write_initial_frame(stack: &mut [u32], entry: FrameEntry) -> usize {
    let sp = stack.len() - FRAME_WORDS;
    let frame = &mut stack[sp..];
    frame.fill(0);
    frame[R0] = entry.arg;
    frame[LR] = entry.lr;
    frame[PC] = entry.pc;
    frame[XPSR] = XPSR_THUMB;
    sp
}
