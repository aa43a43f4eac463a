//! Screen services. Colors arrive as `0xRRGGBB`; coordinates are pixels.

use crate::devices::console::{with_console, FontSize};
use crate::devices::framebuffer::color::Color;
use crate::syscalls::dispatcher::SyscallResult;

pub fn sys_clear_screen() -> SyscallResult {
    with_console(|c| c.clear());
    Ok(0)
}

pub fn sys_draw_rect(color: u64, x: u64, y: u64, width: u64, height: u64) -> SyscallResult {
    let color = Color::from_hex(color as u32);
    with_console(|c| c.draw_rect(color, x, y, width, height));
    Ok(0)
}

/// Levels 1 to 3; see [`FontSize`]. Any other level leaves the font alone.
pub fn sys_change_font_size(level: u64) -> SyscallResult {
    if let Some(size) = FontSize::from_level(level) {
        with_console(|c| c.set_font_size(size));
    }
    Ok(0)
}

pub fn sys_put_char(ch: u64, x: u64, y: u64, color: u64) -> SyscallResult {
    let color = Color::from_hex(color as u32);
    with_console(|c| c.put_char(ch as u8, x as u32, y as u32, color));
    Ok(0)
}
