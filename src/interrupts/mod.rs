//! # Interrupt Handling
//!
//! - `gdt`: kernel GDT with the code segment every gate refers to
//! - `idt`: gate descriptors and the table loaded at boot
//! - `pic`: 8259 remap, masks and end-of-interrupt
//! - `stubs`: naked entry points that build a [`TrapFrame`]
//! - `handlers`: per-vector dispatch once the frame is built
//!
//! [`TrapFrame`]: crate::registers::TrapFrame

pub mod gdt;
pub mod handlers;
pub mod idt;
pub mod pic;
pub mod stubs;

/// Install the IDT, unmask timer and keyboard, enable interrupts.
pub fn init() -> Result<(), &'static str> {
    idt::load();
    if !x86_64::instructions::interrupts::are_enabled() {
        return Err("interrupts still disabled after loading the IDT");
    }
    Ok(())
}
