use crate::devices::drivers::rtc::RtcTime;
use crate::registers::REG_COUNT;
use crate::syscalls::handlers;
use crate::syscalls::numbers::Syscall;
use crate::KernelState;

/// System call result type
pub type SyscallResult = Result<u64, SyscallError>;

/// System call errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    InvalidSyscall,
}

impl SyscallError {
    /// Callers only ever see -1.
    pub fn as_errno(self) -> i64 {
        match self {
            Self::InvalidSyscall => -1,
        }
    }
}

/// Main syscall dispatcher
pub fn dispatch(state: &KernelState, number: u64, a1: u64, a2: u64, a3: u64, a4: u64, a5: u64) -> i64 {
    let Ok(call) = Syscall::try_from(number) else {
        #[cfg(debug_assertions)]
        println!("SYSCALL: unknown number {}", number);
        return SyscallError::InvalidSyscall.as_errno();
    };

    let result = match call {
        // Console
        Syscall::Write => handlers::io::sys_write(a1 as *const u8, a2 as usize),
        Syscall::Read => handlers::io::sys_read(state, a1, a2 as *mut u8, a3 as usize),
        Syscall::ClearScreen => handlers::video::sys_clear_screen(),

        // Time
        Syscall::Sleep => handlers::time::sys_sleep(a1),
        Syscall::GetTicks => handlers::time::sys_get_ticks(),
        Syscall::GetTime => handlers::time::sys_get_time(a1 as *mut RtcTime),

        // Video
        Syscall::DrawRect => handlers::video::sys_draw_rect(a1, a2, a3, a4, a5),
        Syscall::ChangeFontSize => handlers::video::sys_change_font_size(a1),
        Syscall::PutChar => handlers::video::sys_put_char(a1, a2, a3, a4),

        // System
        Syscall::GetRegisters => handlers::system::sys_get_registers(state, a1 as *mut [u64; REG_COUNT]),
        Syscall::PlaySound => handlers::system::sys_play_sound(a1, a2),

        // Cycle counter
        Syscall::ReadCycleCounter => handlers::time::sys_read_cycle_counter(state),
        Syscall::GetFrequency => handlers::time::sys_get_frequency(state),
        Syscall::CyclesToMillis => handlers::time::sys_cycles_to_millis(state, a1),
        Syscall::CyclesToMicros => handlers::time::sys_cycles_to_micros(state, a1),
        Syscall::HasCounter => handlers::time::sys_has_counter(state),
        Syscall::HasInvariantCounter => handlers::time::sys_has_invariant_counter(),
    };

    match result {
        Ok(value) => value as i64,
        Err(e) => {
            #[cfg(debug_assertions)]
            println!("SYSCALL: {:?} failed: {:?}", call, e);
            e.as_errno()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::RegisterSnapshot;

    #[test]
    fn unknown_numbers_return_minus_one() {
        let state = KernelState::new();
        assert_eq!(dispatch(&state, 99, 0, 0, 0, 0, 0), -1);
        assert_eq!(dispatch(&state, 17, 1, 2, 3, 4, 5), -1);
        assert_eq!(dispatch(&state, u64::MAX, 0, 0, 0, 0, 0), -1);
    }

    #[test]
    fn get_registers_copies_the_frozen_snapshot() {
        let state = KernelState::new();
        let snapshot = RegisterSnapshot(core::array::from_fn(|i| 0x1000 + i as u64));
        state.registers.freeze(&snapshot);

        let mut out = [0u64; REG_COUNT];
        let ret = dispatch(&state, Syscall::GetRegisters as u64, out.as_mut_ptr() as u64, 0, 0, 0, 0);
        assert_eq!(ret, 0);
        assert_eq!(out, snapshot.0);
    }

    #[test]
    fn get_registers_before_any_freeze_is_all_zero() {
        let state = KernelState::new();
        let mut out = [0xAAu64; REG_COUNT];
        dispatch(&state, Syscall::GetRegisters as u64, out.as_mut_ptr() as u64, 0, 0, 0, 0);
        assert_eq!(out, [0; REG_COUNT]);
    }

    #[test]
    fn void_services_return_zero_for_null_pointers() {
        let state = KernelState::new();
        assert_eq!(dispatch(&state, Syscall::GetRegisters as u64, 0, 0, 0, 0, 0), 0);
        assert_eq!(dispatch(&state, Syscall::GetTime as u64, 0, 0, 0, 0, 0), 0);
        assert_eq!(dispatch(&state, Syscall::Write as u64, 0, 16, 0, 0, 0), 0);
        assert_eq!(dispatch(&state, Syscall::Read as u64, 0, 0, 4, 0, 0), 0);
    }

    #[test]
    fn reads_from_other_descriptors_return_nothing() {
        let state = KernelState::new();
        let mut buf = [0u8; 4];
        let ret = dispatch(&state, Syscall::Read as u64, 1, buf.as_mut_ptr() as u64, 4, 0, 0);
        assert_eq!(ret, 0);
    }

    #[test]
    fn out_of_range_font_sizes_are_ignored() {
        let state = KernelState::new();
        for level in [0, 4, 7, u64::MAX] {
            assert_eq!(dispatch(&state, Syscall::ChangeFontSize as u64, level, 0, 0, 0, 0), 0);
        }
    }

    #[test]
    fn oversized_sound_frequency_is_truncated_not_rejected() {
        let state = KernelState::new();
        // 2^40 Hz truncates to 0 Hz; a zero duration returns at once
        assert_eq!(dispatch(&state, Syscall::PlaySound as u64, 1 << 40, 0, 0, 0, 0), 0);
    }
}
