//! Process-wide kernel state.
//!
//! Everything the trap handlers share lives in one [`KernelState`]; handlers
//! and syscall services receive it by reference instead of reaching for
//! separate globals.

use spin::Mutex;

use crate::{
    devices::drivers::ps2_keyboard::Keyboard,
    registers::SnapshotSlot,
    time::{cpu::Tsc, cycles::CycleClock},
};

pub struct KernelState {
    /// Decoder state and the 256-byte ring buffer. Taken from IRQ1 with IF
    /// clear, and everywhere else through `without_interrupts`.
    pub keyboard: Mutex<Keyboard>,
    /// Last frozen register snapshot.
    pub registers: SnapshotSlot,
    pub clock: CycleClock<Tsc>,
}

impl KernelState {
    pub const fn new() -> Self {
        Self {
            keyboard: Mutex::new(Keyboard::new()),
            registers: SnapshotSlot::new(),
            clock: CycleClock::new(Tsc),
        }
    }
}

impl Default for KernelState {
    fn default() -> Self {
        Self::new()
    }
}

pub static KERNEL: KernelState = KernelState::new();
