//! Device drivers:
//! - `ps2_keyboard`: IRQ1 scancode decoder and key buffer
//! - `rtc`: CMOS real-time clock
//! - `speaker`: PC speaker tones over PIT channel 2

pub mod ps2_keyboard;
pub mod rtc;
pub mod speaker;
