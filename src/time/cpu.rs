//! Cycle counter access and CPUID capability queries.

use core::arch::x86_64::{__cpuid, _rdtsc};

use super::cycles::CounterSource;

const CPUID_FEATURES: u32 = 0x1;
const CPUID_MAX_EXTENDED: u32 = 0x8000_0000;
const CPUID_ADVANCED_POWER: u32 = 0x8000_0007;

const EDX_TSC: u32 = 1 << 4;
const EDX_INVARIANT_TSC: u32 = 1 << 8;

#[inline(always)]
pub fn read_tsc() -> u64 {
    unsafe { _rdtsc() }
}

pub fn has_tsc() -> bool {
    let leaf = unsafe { __cpuid(CPUID_FEATURES) };
    leaf.edx & EDX_TSC != 0
}

/// The counter ticks at a constant rate regardless of P-/C-states.
pub fn has_invariant_tsc() -> bool {
    let max = unsafe { __cpuid(CPUID_MAX_EXTENDED) }.eax;
    if max < CPUID_ADVANCED_POWER {
        return false;
    }
    let leaf = unsafe { __cpuid(CPUID_ADVANCED_POWER) };
    leaf.edx & EDX_INVARIANT_TSC != 0
}

/// The TSC measured against the PIT tick counter.
pub struct Tsc;

impl CounterSource for Tsc {
    fn ticks(&self) -> u64 {
        super::ticks()
    }

    fn cycles(&self) -> u64 {
        read_tsc()
    }

    fn is_supported(&self) -> bool {
        has_tsc()
    }
}
