//! # System Call Handlers
//!
//! ## Modules
//!
//! - `io`: console text in and out (write, read)
//! - `time`: timer ticks, RTC and the cycle counter
//! - `video`: screen clearing, rectangles, characters, font size
//! - `system`: register snapshot and PC speaker
//!
//! ## Handler Signature
//!
//! Each handler takes its arguments already converted from registers and
//! returns a result:
//! ```ignore
//! fn sys_write(buf: *const u8, len: usize) -> SyscallResult
//! ```

pub mod io;
pub mod system;
pub mod time;
pub mod video;
