//! # Time Keeping
//!
//! Two clocks:
//!
//! - the PIT tick counter, bumped by IRQ0 at the power-on rate (~18.2 Hz,
//!   about 55 ms per tick), used for `sleep` and `get-ticks`
//! - the CPU cycle counter (TSC), calibrated against the tick counter by
//!   [`cycles::CycleClock`] and used for every fine-grained measurement
//!
//! The PIT is never reprogrammed; calibration assumes its default rate.

pub mod cpu;
pub mod cycles;

use core::sync::atomic::{AtomicU64, Ordering};

/// PIT input clock.
pub const PIT_FREQUENCY_HZ: u64 = 1_193_182;

pub static TIMER_TICKS: AtomicU64 = AtomicU64::new(0);

/// Called from the IRQ0 handler.
pub fn on_timer_tick() {
    TIMER_TICKS.fetch_add(1, Ordering::Relaxed);
}

pub fn ticks() -> u64 {
    TIMER_TICKS.load(Ordering::Relaxed)
}

/// Spin until `ticks` more timer interrupts have arrived. Needs interrupts
/// enabled, or it never returns.
pub fn sleep(ticks: u64) {
    let start = self::ticks();
    while self::ticks().wrapping_sub(start) < ticks {
        core::hint::spin_loop();
    }
}

/// Spin for `millis` milliseconds of cycle-counter time. Falls back to whole
/// timer ticks when the counter is unusable.
pub fn busy_wait_millis(millis: u64) {
    let clock = &crate::KERNEL.clock;
    let cycles = clock.millis_to_cycles(millis);
    if cycles == 0 {
        sleep(millis_to_ticks(millis));
        return;
    }
    let start = clock.now();
    while clock.now().wrapping_sub(start) < cycles {
        core::hint::spin_loop();
    }
}

/// Whole reference ticks in `millis`, rounded down.
fn millis_to_ticks(millis: u64) -> u64 {
    millis.saturating_mul(cycles::REFERENCE_HZ) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_fallback_rounds_down_and_saturates() {
        assert_eq!(millis_to_ticks(1000), cycles::REFERENCE_HZ);
        assert_eq!(millis_to_ticks(55), 0);
        assert_eq!(millis_to_ticks(u64::MAX), u64::MAX / 1000);
    }
}
