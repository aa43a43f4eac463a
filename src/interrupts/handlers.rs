//! Rust side of the trap stubs.
//!
//! Every installed vector lands in [`trap_entry`] with IF clear. The two IRQ
//! paths acknowledge the PIC themselves; the fault and syscall paths never
//! touch it.

use crate::{
    devices::{console, drivers::ps2_keyboard::{self, KeyAction}},
    exceptions,
    registers::TrapFrame,
    syscalls, time, KERNEL,
};

use super::{idt::Vector, pic};

/// Called by every stub with the vector it was installed for.
pub extern "C" fn trap_entry(vector: u64, frame: &mut TrapFrame) {
    match Vector::from_u8(vector as u8) {
        Some(Vector::DivideError) | Some(Vector::InvalidOpcode) => {
            exceptions::dispatch_exception(&KERNEL, vector, frame);
        }
        Some(Vector::Timer) => {
            time::on_timer_tick();
            pic::end_of_interrupt(Vector::Timer.as_u8());
        }
        Some(Vector::Keyboard) => keyboard_interrupt(frame),
        Some(Vector::Syscall) => syscall_interrupt(frame),
        None => {}
    }
}

fn keyboard_interrupt(frame: &mut TrapFrame) {
    let scancode = ps2_keyboard::read_scancode();
    let action = KERNEL.keyboard.lock().on_scancode(scancode);

    match action {
        KeyAction::DumpRegisters => {
            // the dump waits for a key, which needs IRQ1 acknowledged first
            pic::end_of_interrupt(Vector::Keyboard.as_u8());
            exceptions::dump_registers(&KERNEL, frame);
            return;
        }
        KeyAction::ClearScreen => console::with_console(|c| c.clear()),
        KeyAction::Dropped(ch) => {
            println!("[keyboard] buffer full, dropped {:?}", ch as char);
        }
        KeyAction::Queued(_) | KeyAction::Ignored => {}
    }

    pic::end_of_interrupt(Vector::Keyboard.as_u8());
}

/// RDI carries the number, RSI/RDX/RCX/R8/R9 the arguments, the result goes
/// back in RAX.
fn syscall_interrupt(frame: &mut TrapFrame) {
    // sleep and the speaker wait on timer ticks
    x86_64::instructions::interrupts::enable();

    let r = &frame.regs;
    let result = syscalls::dispatch(&KERNEL, r.rdi, r.rsi, r.rdx, r.rcx, r.r8, r.r9);
    frame.regs.rax = result as u64;
}
