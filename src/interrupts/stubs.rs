//! Trap entry stubs.
//!
//! None of the five vectors pushes an error code, so all stubs share one
//! shape: push the general-purpose registers on top of the CPU frame (RAX ends
//! up lowest, matching [`TrapFrame`]), call [`trap_entry`] with the vector
//! and a pointer to the frame, restore, `iretq`.
//!
//! The CPU aligns RSP to 16 bytes before pushing its 5-word frame in long
//! mode; 5 + 15 pushes keep it aligned for the call. Anything the handler
//! writes into the frame (the syscall result in RAX, a recovery RIP/RSP after a
//! fault) is what the interrupted context resumes with.
//!
//! The kernel is built for a target without a red zone, so pushing below the
//! interrupted RSP is safe.
//!
//! [`TrapFrame`]: crate::registers::TrapFrame

use super::{handlers::trap_entry, idt::Vector};

macro_rules! trap_stub {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        pub unsafe extern "C" fn $name() -> ! {
            core::arch::naked_asm!(
                "cld",
                "push r15",
                "push r14",
                "push r13",
                "push r12",
                "push r11",
                "push r10",
                "push r9",
                "push r8",
                "push rbp",
                "push rdi",
                "push rsi",
                "push rdx",
                "push rcx",
                "push rbx",
                "push rax",
                "mov edi, {vector}",
                "mov rsi, rsp",
                "call {entry}",
                "pop rax",
                "pop rbx",
                "pop rcx",
                "pop rdx",
                "pop rsi",
                "pop rdi",
                "pop rbp",
                "pop r8",
                "pop r9",
                "pop r10",
                "pop r11",
                "pop r12",
                "pop r13",
                "pop r14",
                "pop r15",
                "iretq",
                vector = const $vector,
                entry = sym trap_entry,
            );
        }
    };
}

trap_stub!(divide_error, Vector::DivideError as u8);
trap_stub!(invalid_opcode, Vector::InvalidOpcode as u8);
trap_stub!(timer, Vector::Timer as u8);
trap_stub!(keyboard, Vector::Keyboard as u8);
trap_stub!(syscall, Vector::Syscall as u8);
