//! CMOS real-time clock.
//!
//! Read by the `get-time` syscall. Values are converted from BCD and 12-hour
//! mode when the status register says so.

use x86_64::instructions::port::Port;

const CMOS_ADDRESS: u16 = 0x70;
const CMOS_DATA: u16 = 0x71;

const RTC_SECONDS: u8 = 0x00;
const RTC_MINUTES: u8 = 0x02;
const RTC_HOURS: u8 = 0x04;
const RTC_DAY: u8 = 0x07;
const RTC_MONTH: u8 = 0x08;
const RTC_YEAR: u8 = 0x09;
const RTC_STATUS_A: u8 = 0x0A;
const RTC_STATUS_B: u8 = 0x0B;

const UPDATE_SPIN_LIMIT: u32 = 1_000_000;

/// Layout shared with userland through the `get-time` syscall.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtcTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day: u8,
    pub month: u8,
    /// Two-digit year.
    pub year: u8,
}

fn cmos_read(reg: u8) -> u8 {
    let mut addr = Port::<u8>::new(CMOS_ADDRESS);
    let mut data = Port::<u8>::new(CMOS_DATA);
    unsafe {
        // bit 7 keeps NMI disabled while the register is selected
        addr.write(0x80 | reg);
        data.read()
    }
}

fn bcd_to_binary(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Normalize raw register values according to status register B.
pub fn normalize(mut raw: RtcTime, status_b: u8) -> RtcTime {
    let pm = raw.hours & 0x80 != 0;
    raw.hours &= 0x7F;
    if status_b & 0x04 == 0 {
        raw.seconds = bcd_to_binary(raw.seconds);
        raw.minutes = bcd_to_binary(raw.minutes);
        raw.hours = bcd_to_binary(raw.hours);
        raw.day = bcd_to_binary(raw.day);
        raw.month = bcd_to_binary(raw.month);
        raw.year = bcd_to_binary(raw.year);
    }
    if status_b & 0x02 == 0 && pm {
        raw.hours = (raw.hours + 12) % 24;
    }
    raw
}

pub fn read_time() -> RtcTime {
    let mut spins = 0u32;
    while cmos_read(RTC_STATUS_A) & 0x80 != 0 && spins < UPDATE_SPIN_LIMIT {
        core::hint::spin_loop();
        spins += 1;
    }
    let raw = RtcTime {
        seconds: cmos_read(RTC_SECONDS),
        minutes: cmos_read(RTC_MINUTES),
        hours: cmos_read(RTC_HOURS),
        day: cmos_read(RTC_DAY),
        month: cmos_read(RTC_MONTH),
        year: cmos_read(RTC_YEAR),
    };
    normalize(raw, cmos_read(RTC_STATUS_B))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_twelve_hour_pm_is_converted() {
        let raw = RtcTime { seconds: 0x59, minutes: 0x30, hours: 0x80 | 0x03, day: 0x17, month: 0x10, year: 0x26 };
        let t = normalize(raw, 0x00);
        assert_eq!(t, RtcTime { seconds: 59, minutes: 30, hours: 15, day: 17, month: 10, year: 26 });
    }

    #[test]
    fn binary_twenty_four_hour_is_left_alone() {
        let raw = RtcTime { seconds: 5, minutes: 6, hours: 23, day: 1, month: 2, year: 26 };
        assert_eq!(normalize(raw, 0x06), raw);
    }
}
