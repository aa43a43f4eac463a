//! # I/O System Call Handlers
//!
//! | FD | Stream | Implementation         |
//! |----|--------|------------------------|
//! | 0  | stdin  | Keyboard ring buffer   |
//!
//! `write` has no descriptor argument; it always goes to the console.

use x86_64::instructions::interrupts::without_interrupts;

use crate::devices::{console::with_console, drivers::ps2_keyboard::Keyboard};
use crate::syscalls::dispatcher::SyscallResult;
use crate::KernelState;

const STDIN: u64 = 0;

/// Write `len` bytes from `buf` to the console. Nothing to write from a null
/// `buf`.
pub fn sys_write(buf: *const u8, len: usize) -> SyscallResult {
    if len == 0 || buf.is_null() {
        return Ok(0);
    }
    let bytes = unsafe { core::slice::from_raw_parts(buf, len) };
    with_console(|c| c.write_bytes(bytes));
    Ok(0)
}

/// Non-blocking read of up to `count` characters. Returns how many were
/// copied, which is 0 when nothing is pending or `fd` is not stdin.
pub fn sys_read(state: &KernelState, fd: u64, buf: *mut u8, count: usize) -> SyscallResult {
    if fd != STDIN || count == 0 || buf.is_null() {
        return Ok(0);
    }
    let out = unsafe { core::slice::from_raw_parts_mut(buf, count) };
    let read = without_interrupts(|| drain_into(&mut state.keyboard.lock(), out));
    Ok(read as u64)
}

/// Move pending characters into `out` until it is full or the buffer is empty.
fn drain_into(keyboard: &mut Keyboard, out: &mut [u8]) -> usize {
    let mut n = 0;
    while n < out.len() {
        match keyboard.read_char() {
            Some(c) => {
                out[n] = c;
                n += 1;
            }
            None => break,
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard_with(scancodes: &[u8]) -> Keyboard {
        let mut kb = Keyboard::new();
        for &sc in scancodes {
            kb.on_scancode(sc);
        }
        kb
    }

    #[test]
    fn drain_stops_when_the_buffer_is_empty() {
        // h, i
        let mut kb = keyboard_with(&[0x23, 0x17]);
        let mut out = [0u8; 8];
        assert_eq!(drain_into(&mut kb, &mut out), 2);
        assert_eq!(&out[..2], b"hi");
        assert_eq!(drain_into(&mut kb, &mut out), 0);
    }

    #[test]
    fn drain_leaves_the_rest_for_the_next_read() {
        // a, b, c
        let mut kb = keyboard_with(&[0x1E, 0x30, 0x2E]);
        let mut out = [0u8; 2];
        assert_eq!(drain_into(&mut kb, &mut out), 2);
        assert_eq!(&out, b"ab");
        assert_eq!(kb.pending(), 1);
        assert_eq!(kb.read_char(), Some(b'c'));
    }

    #[test]
    fn empty_writes_and_reads_touch_nothing() {
        let state = KernelState::new();
        assert_eq!(sys_write(core::ptr::null(), 0), Ok(0));
        assert_eq!(sys_read(&state, STDIN, core::ptr::null_mut(), 0), Ok(0));
        assert_eq!(sys_write(core::ptr::null(), 3), Ok(0));
        assert_eq!(sys_read(&state, STDIN, core::ptr::null_mut(), 4), Ok(0));
    }
}
