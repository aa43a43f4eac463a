//! # Barebones x86_64 Kernel Library
//!
//! Trap-handling core of a single-core bare-metal kernel:
//!
//! - `interrupts`: GDT, IDT gate installation, PIC, trap entry stubs
//! - `registers`: register capture at trap entry and the frozen snapshot slot
//! - `exceptions`: fault reporter (register dump + operator acknowledgment)
//! - `devices`: PS/2 keyboard decoder, framebuffer console, RTC, PC speaker
//! - `time`: timer ticks and the cycle-counter calibration engine
//! - `syscalls`: `int 0x80` dispatch table
//! - `kernel`: kernel state and boot sequence
//!
//! The library builds with `std` under `cfg(test)` so the hardware-independent
//! pieces can be exercised by the regular test harness on the host.

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod serial;
pub mod format;
pub mod registers;
pub mod exceptions;
pub mod interrupts;
pub mod devices;
pub mod time;
pub mod syscalls;
pub mod kernel;

pub use kernel::{KernelState, KERNEL};

/// Park the CPU forever.
pub fn hlt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}
