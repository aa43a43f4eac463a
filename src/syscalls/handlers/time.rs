//! # Time System Call Handlers
//!
//! ## Timer Resolution
//!
//! The PIT runs at its power-on rate, ~18.2 Hz, so `sleep` and `get-ticks`
//! have ~55 ms resolution. Anything finer goes through the cycle counter.

use crate::devices::drivers::rtc::{self, RtcTime};
use crate::syscalls::dispatcher::SyscallResult;
use crate::time::{self, cpu, cycles::CounterSource};
use crate::KernelState;

/// Busy-wait for `ticks` timer ticks.
pub fn sys_sleep(ticks: u64) -> SyscallResult {
    time::sleep(ticks);
    Ok(0)
}

pub fn sys_get_ticks() -> SyscallResult {
    Ok(time::ticks())
}

/// Fill `out` with the current RTC date and time. A null `out` is skipped.
pub fn sys_get_time(out: *mut RtcTime) -> SyscallResult {
    if out.is_null() {
        return Ok(0);
    }
    let now = rtc::read_time();
    unsafe { out.write(now) };
    Ok(0)
}

pub fn sys_read_cycle_counter(state: &KernelState) -> SyscallResult {
    Ok(state.clock.now())
}

pub fn sys_get_frequency(state: &KernelState) -> SyscallResult {
    Ok(state.clock.frequency())
}

pub fn sys_cycles_to_millis(state: &KernelState, cycles: u64) -> SyscallResult {
    Ok(state.clock.cycles_to_millis(cycles))
}

pub fn sys_cycles_to_micros(state: &KernelState, cycles: u64) -> SyscallResult {
    Ok(state.clock.cycles_to_micros(cycles))
}

pub fn sys_has_counter(state: &KernelState) -> SyscallResult {
    Ok(state.clock.source().is_supported() as u64)
}

pub fn sys_has_invariant_counter() -> SyscallResult {
    Ok(cpu::has_invariant_tsc() as u64)
}
