//! Register snapshot and PC speaker services.

use crate::devices::drivers::speaker;
use crate::registers::REG_COUNT;
use crate::syscalls::dispatcher::SyscallResult;
use crate::KernelState;

/// Copy the last frozen snapshot to `out`, slot order unchanged. All zeros if
/// nothing was frozen yet. A null `out` is skipped.
pub fn sys_get_registers(state: &KernelState, out: *mut [u64; REG_COUNT]) -> SyscallResult {
    if out.is_null() {
        return Ok(0);
    }
    let snapshot = state.registers.read_frozen();
    unsafe { out.write(snapshot.0) };
    Ok(0)
}

/// Beep at `hz` for `millis` milliseconds. Blocks for the whole duration.
/// Only the low 32 bits of `hz` are used.
pub fn sys_play_sound(hz: u64, millis: u64) -> SyscallResult {
    speaker::play(hz as u32, millis);
    Ok(0)
}
