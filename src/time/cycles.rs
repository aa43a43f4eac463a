//! # Cycle-Counter Calibration
//!
//! Measures the cycle counter's frequency against the PIT tick counter and
//! converts between cycles, milliseconds and microseconds.
//!
//! ## Calibration
//!
//! 1. If the counter is not supported, stay uncalibrated (frequency 0).
//! 2. Record ticks and cycles, spin until `CALIBRATION_TICKS` ticks have
//!    passed, record both again.
//! 3. `frequency = cycles * REFERENCE_HZ / ticks`. The PIT really runs at
//!    ~18.2065 Hz; 18 is close enough for benchmark-grade timing.
//! 4. Zero elapsed ticks falls back to `FALLBACK_FREQUENCY_HZ`.
//!
//! The first conversion calibrates lazily and the result is cached. The spin
//! in step 2 has no timeout: with the timer masked it never ends, so the
//! kernel calibrates explicitly during boot, after interrupts are live.
//!
//! Every conversion returns 0 while the frequency is 0, and divides first
//! whenever the multiply would not fit in 64 bits.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const CALIBRATION_TICKS: u64 = 10;
pub const REFERENCE_HZ: u64 = 18;
pub const FALLBACK_FREQUENCY_HZ: u64 = 2_000_000_000;

const MILLIS_PER_SECOND: u64 = 1_000;
const MICROS_PER_SECOND: u64 = 1_000_000;

/// A free-running counter plus the fixed-rate tick counter used to measure it.
pub trait CounterSource {
    /// Reference timer ticks since boot.
    fn ticks(&self) -> u64;
    /// Raw cycle counter.
    fn cycles(&self) -> u64;
    /// Capability query; an unsupported counter is never calibrated.
    fn is_supported(&self) -> bool;
}

/// `value * mul / div`, dividing first if the product would overflow.
fn scale(value: u64, mul: u64, div: u64) -> u64 {
    match value.checked_mul(mul) {
        Some(n) => n / div,
        None => (value / div).saturating_mul(mul),
    }
}

pub struct CycleClock<S> {
    source: S,
    frequency_hz: AtomicU64,
    calibrated: AtomicBool,
}

impl<S: CounterSource> CycleClock<S> {
    pub const fn new(source: S) -> Self {
        Self {
            source,
            frequency_hz: AtomicU64::new(0),
            calibrated: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current raw counter value.
    pub fn now(&self) -> u64 {
        self.source.cycles()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated.load(Ordering::Acquire)
    }

    pub fn calibrate(&self) {
        if !self.source.is_supported() {
            self.frequency_hz.store(0, Ordering::Release);
            self.calibrated.store(false, Ordering::Release);
            return;
        }

        let start_tick = self.source.ticks();
        let start_cycles = self.source.cycles();

        while self.source.ticks().wrapping_sub(start_tick) < CALIBRATION_TICKS {
            core::hint::spin_loop();
        }

        let end_cycles = self.source.cycles();
        let end_tick = self.source.ticks();

        let elapsed_ticks = end_tick.wrapping_sub(start_tick);
        let elapsed_cycles = end_cycles.wrapping_sub(start_cycles);

        let hz = if elapsed_ticks > 0 {
            scale(elapsed_cycles, REFERENCE_HZ, elapsed_ticks)
        } else {
            FALLBACK_FREQUENCY_HZ
        };

        self.frequency_hz.store(hz, Ordering::Release);
        self.calibrated.store(true, Ordering::Release);
    }

    fn calibrated_frequency(&self) -> u64 {
        if !self.is_calibrated() {
            self.calibrate();
        }
        self.frequency_hz.load(Ordering::Acquire)
    }

    /// Counter frequency in Hz, 0 if the counter is unsupported.
    pub fn frequency(&self) -> u64 {
        self.calibrated_frequency()
    }

    pub fn cycles_to_millis(&self, cycles: u64) -> u64 {
        let hz = self.calibrated_frequency();
        if hz == 0 {
            return 0;
        }
        if cycles > u64::MAX / MILLIS_PER_SECOND {
            (cycles / hz).saturating_mul(MILLIS_PER_SECOND)
        } else {
            cycles * MILLIS_PER_SECOND / hz
        }
    }

    /// Whole milliseconds first, then the cycles left over are converted on
    /// their own. Neither step needs a multiply wider than 64 bits.
    pub fn cycles_to_micros(&self, cycles: u64) -> u64 {
        let hz = self.calibrated_frequency();
        if hz == 0 {
            return 0;
        }
        let millis = self.cycles_to_millis(cycles);
        let consumed = scale(millis, hz, MILLIS_PER_SECOND);
        let remaining = cycles.saturating_sub(consumed);
        let micros_from_remaining = scale(remaining, MICROS_PER_SECOND, hz);
        millis
            .saturating_mul(MILLIS_PER_SECOND)
            .saturating_add(micros_from_remaining)
    }

    pub fn millis_to_cycles(&self, millis: u64) -> u64 {
        let hz = self.calibrated_frequency();
        if hz == 0 {
            return 0;
        }
        if millis > u64::MAX / hz {
            (millis / MILLIS_PER_SECOND).saturating_mul(hz)
        } else {
            millis * hz / MILLIS_PER_SECOND
        }
    }

    #[cfg(test)]
    pub(crate) fn calibrated_at(source: S, hz: u64) -> Self {
        Self {
            source,
            frequency_hz: AtomicU64::new(hz),
            calibrated: AtomicBool::new(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Each `ticks()` read advances simulated time by one tick.
    struct FakeCounter {
        supported: bool,
        cycles_per_tick: u64,
        tick: Cell<u64>,
        cycle: Cell<u64>,
        tick_reads: Cell<u64>,
    }

    impl FakeCounter {
        fn new(cycles_per_tick: u64) -> Self {
            Self {
                supported: true,
                cycles_per_tick,
                tick: Cell::new(0),
                cycle: Cell::new(0),
                tick_reads: Cell::new(0),
            }
        }

        fn unsupported() -> Self {
            Self { supported: false, ..Self::new(1) }
        }
    }

    impl CounterSource for FakeCounter {
        fn ticks(&self) -> u64 {
            self.tick_reads.set(self.tick_reads.get() + 1);
            let t = self.tick.get();
            self.tick.set(t + 1);
            self.cycle.set(self.cycle.get() + self.cycles_per_tick);
            t
        }

        fn cycles(&self) -> u64 {
            self.cycle.get()
        }

        fn is_supported(&self) -> bool {
            self.supported
        }
    }

    #[test]
    fn calibration_scales_cycles_by_the_reference_rate() {
        // start tick 0; the loop exits on the read that returns 10, the final
        // read returns 11, and 10 ticks' worth of cycles were counted
        let clock = CycleClock::new(FakeCounter::new(110_000_000));
        clock.calibrate();
        assert!(clock.is_calibrated());
        assert_eq!(clock.frequency(), 10 * 110_000_000 * REFERENCE_HZ / 11);
        assert_eq!(clock.frequency(), 1_800_000_000);
    }

    #[test]
    fn frequency_is_cached_after_the_first_call() {
        let clock = CycleClock::new(FakeCounter::new(1_000));
        let first = clock.frequency();
        let reads = clock.source().tick_reads.get();
        assert!(reads > 0);
        assert_eq!(clock.frequency(), first);
        assert_eq!(clock.source().tick_reads.get(), reads);
    }

    #[test]
    fn explicit_calibration_measures_again() {
        let clock = CycleClock::new(FakeCounter::new(1_000));
        clock.frequency();
        let reads = clock.source().tick_reads.get();
        clock.calibrate();
        assert!(clock.source().tick_reads.get() > reads);
    }

    #[test]
    fn unsupported_counter_degrades_to_zero() {
        let clock = CycleClock::new(FakeCounter::unsupported());
        assert_eq!(clock.frequency(), 0);
        assert!(!clock.is_calibrated());
        assert_eq!(clock.cycles_to_millis(1_000_000), 0);
        assert_eq!(clock.cycles_to_micros(1_000_000), 0);
        assert_eq!(clock.millis_to_cycles(1_000), 0);
        assert_eq!(clock.source().tick_reads.get(), 0);
    }

    #[test]
    fn two_gigahertz_second_is_a_thousand_millis() {
        let clock = CycleClock::calibrated_at(FakeCounter::new(1), FALLBACK_FREQUENCY_HZ);
        assert_eq!(clock.frequency(), 2_000_000_000);
        assert_eq!(clock.cycles_to_millis(2_000_000_000), 1000);
        assert_eq!(clock.millis_to_cycles(1000), 2_000_000_000);
        assert_eq!(clock.cycles_to_micros(2_000_000_000), 1_000_000);
    }

    #[test]
    fn micros_keep_the_sub_millisecond_remainder() {
        let clock = CycleClock::calibrated_at(FakeCounter::new(1), 2_000_000_000);
        // 1.5 us
        assert_eq!(clock.cycles_to_micros(3_000), 1);
        // 2 ms + 250 us
        assert_eq!(clock.cycles_to_micros(4_500_000), 2_250);
        assert_eq!(clock.cycles_to_millis(4_500_000), 2);
    }

    #[test]
    fn millis_round_trip_within_one_millisecond() {
        for hz in [1_000_000u64, 1_800_000_000, 2_000_000_000, 3_600_000_007] {
            let clock = CycleClock::calibrated_at(FakeCounter::new(1), hz);
            let one_ms = hz / 1000;
            for c in [0, 1, one_ms, hz, hz * 3 + 12_345, hz * 1_000] {
                let back = clock.millis_to_cycles(clock.cycles_to_millis(c));
                assert!(back <= c, "hz {hz} c {c} back {back}");
                assert!(c - back <= one_ms + 1, "hz {hz} c {c} back {back}");
            }
        }
    }

    #[test]
    fn huge_inputs_divide_first_instead_of_overflowing() {
        let clock = CycleClock::calibrated_at(FakeCounter::new(1), 2_000_000_000);
        assert_eq!(clock.cycles_to_millis(u64::MAX), (u64::MAX / 2_000_000_000) * 1000);
        assert!(clock.cycles_to_micros(u64::MAX) >= clock.cycles_to_millis(u64::MAX) * 1000);
        assert_eq!(clock.millis_to_cycles(u64::MAX), u64::MAX);
        let big = u64::MAX / 2_000_000_000 + 1;
        assert_eq!(clock.millis_to_cycles(big), (big / 1000) * 2_000_000_000);
    }

    #[test]
    fn sub_kilohertz_counter_saturates_instead_of_overflowing() {
        let clock = CycleClock::calibrated_at(FakeCounter::new(1), 500);
        assert_eq!(clock.cycles_to_millis(u64::MAX), u64::MAX);
        assert_eq!(clock.cycles_to_micros(u64::MAX), u64::MAX);
        assert_eq!(clock.cycles_to_millis(u64::MAX / 1000 + 1), u64::MAX / 1000 / 500 * 1000);
        assert_eq!(clock.millis_to_cycles(u64::MAX), u64::MAX / 1000 * 500);
    }
}
