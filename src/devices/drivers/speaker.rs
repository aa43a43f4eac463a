//! PC speaker driven by PIT channel 2.

use x86_64::instructions::port::Port;

use crate::time::PIT_FREQUENCY_HZ;

const PIT_CHANNEL2: u16 = 0x42;
const PIT_COMMAND: u16 = 0x43;
const SPEAKER_CONTROL: u16 = 0x61;

/// Channel 2, lobyte/hibyte, mode 3 (square wave).
const CHANNEL2_SQUARE_WAVE: u8 = 0xB6;

/// Divisor for `hz`, clamped to the 16-bit counter.
pub fn divisor_for(hz: u32) -> u16 {
    if hz == 0 {
        return 0;
    }
    (PIT_FREQUENCY_HZ / hz as u64).clamp(1, u16::MAX as u64) as u16
}

pub fn start(hz: u32) {
    let divisor = divisor_for(hz);
    if divisor == 0 {
        return;
    }
    unsafe {
        Port::<u8>::new(PIT_COMMAND).write(CHANNEL2_SQUARE_WAVE);
        let mut data = Port::<u8>::new(PIT_CHANNEL2);
        data.write((divisor & 0xFF) as u8);
        data.write((divisor >> 8) as u8);

        let mut control = Port::<u8>::new(SPEAKER_CONTROL);
        let value = control.read();
        if value & 0x03 != 0x03 {
            control.write(value | 0x03);
        }
    }
}

pub fn stop() {
    unsafe {
        let mut control = Port::<u8>::new(SPEAKER_CONTROL);
        let value = control.read();
        control.write(value & 0xFC);
    }
}

/// Beep at `hz` for `millis`, blocking on the cycle clock.
pub fn play(hz: u32, millis: u64) {
    if millis == 0 {
        return;
    }
    start(hz);
    crate::time::busy_wait_millis(millis);
    stop();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisor_tracks_the_pit_input_clock() {
        assert_eq!(divisor_for(440), 2711);
        assert_eq!(divisor_for(1), u16::MAX);
        assert_eq!(divisor_for(0), 0);
        assert_eq!(divisor_for(10_000_000), 1);
    }
}
