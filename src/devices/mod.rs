//! Device Subsystem
//!
//! Hardware device drivers and abstractions:
//! - `drivers`: PS/2 keyboard, RTC, PC speaker
//! - `framebuffer`: Graphics output via linear framebuffer
//! - `console`: text console on top of the framebuffer

pub mod drivers;
pub mod framebuffer;
pub mod console;
