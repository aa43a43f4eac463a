//! Formatting into caller-provided byte buffers.
//!
//! The kernel has no heap. Anything that needs to hand a formatted string to a
//! byte-oriented sink (the syscall `write` path, the boot console) formats into
//! a stack buffer with `format_no_std!` first.

use core::fmt::{self, Write};

/// A fixed-size buffer that implements `fmt::Write`.
pub struct FmtBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FmtBuf<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        FmtBuf { buf, pos: 0 }
    }

}

impl<'a> Write for FmtBuf<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.pos + bytes.len() > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}

/// Format `args` into `buf` and return the written prefix as `&str`.
pub fn format_to<'a>(buf: &'a mut [u8], args: fmt::Arguments<'_>) -> Result<&'a str, fmt::Error> {
    let mut f = FmtBuf::new(buf);
    f.write_fmt(args)?;
    let FmtBuf { buf, pos } = f;
    let written: &'a [u8] = buf;
    // only `write_str` appends, and it only copies whole `&str`s
    Ok(unsafe { core::str::from_utf8_unchecked(&written[..pos]) })
}

#[macro_export]
macro_rules! format_no_std {
    ($buf:expr, $($arg:tt)*) => {
        $crate::format::format_to($buf, core::format_args!($($arg)*))
    };
}
