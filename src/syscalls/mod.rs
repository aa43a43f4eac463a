//! # System Calls
//!
//! Services reachable through `int 0x80`. The trap handler unpacks the
//! registers and calls [`dispatch`]:
//!
//! | Register | Meaning         |
//! |----------|-----------------|
//! | RDI      | syscall number  |
//! | RSI      | argument 1      |
//! | RDX      | argument 2      |
//! | RCX      | argument 3      |
//! | R8       | argument 4      |
//! | R9       | argument 5      |
//! | RAX      | result (out)    |
//!
//! The address space is flat and shared, so pointer arguments are used as-is.

pub mod dispatcher;
pub mod handlers;
pub mod numbers;

pub use dispatcher::dispatch;
pub use numbers::Syscall;
