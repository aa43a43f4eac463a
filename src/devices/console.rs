//! # Framebuffer Text Console
//!
//! Character-cell console on top of [`FramebufferWriter`]. It backs the
//! `write`, `put-char`, `draw-rect`, `clear-screen` and `change-font-size`
//! syscalls and the fault reporter's dump.
//!
//! ## Font sizes
//!
//! | Size | Font   |
//! |------|--------|
//! | 1    | 6x10   |
//! | 2    | 8x13   |
//! | 3    | 10x20  |
//!
//! Without a framebuffer every write goes to the serial port instead, so the
//! kernel stays usable headless.
//!
//! All access from outside IRQ context goes through [`with_console`], which
//! holds the lock with interrupts disabled.

use core::fmt;

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_8X13},
        MonoFont, MonoTextStyle, MonoTextStyleBuilder,
    },
    pixelcolor::Rgb888,
};
use spin::Mutex;

use crate::devices::framebuffer::{color::Color, framebuffer::FramebufferWriter};

pub const DEFAULT_FG: Color = Color::LIGHT_GRAY;
pub const DEFAULT_BG: Color = Color::BLACK;
const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    Small = 1,
    Medium = 2,
    Large = 3,
}

impl FontSize {
    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            1 => Some(Self::Small),
            2 => Some(Self::Medium),
            3 => Some(Self::Large),
            _ => None,
        }
    }

    fn font(self) -> &'static MonoFont<'static> {
        match self {
            Self::Small => &FONT_6X10,
            Self::Medium => &FONT_8X13,
            Self::Large => &FONT_10X20,
        }
    }

    /// (width, height) of one character cell in pixels.
    pub fn cell(self) -> (usize, usize) {
        let size = self.font().character_size;
        (size.width as usize, size.height as usize)
    }
}

pub struct Console {
    fb: Option<FramebufferWriter>,
    col: usize,
    row: usize,
    font: FontSize,
    fg: Color,
    bg: Color,
}

impl Console {
    pub const fn new() -> Self {
        Self {
            fb: None,
            col: 0,
            row: 0,
            font: FontSize::Medium,
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
        }
    }

    pub fn attach(&mut self, fb: FramebufferWriter) {
        self.fb = Some(fb);
        self.clear();
    }

    fn style(&self, fg: Color) -> MonoTextStyle<'static, Rgb888> {
        MonoTextStyleBuilder::new()
            .font(self.font.font())
            .text_color(fg.to_rgb888())
            .background_color(self.bg.to_rgb888())
            .build()
    }

    /// (columns, rows) of the character grid.
    fn grid(&self) -> (usize, usize) {
        let (cw, ch) = self.font.cell();
        match &self.fb {
            Some(fb) => ((fb.width / cw).max(1), (fb.height / ch).max(1)),
            None => (80, 25),
        }
    }

    pub fn clear(&mut self) {
        self.col = 0;
        self.row = 0;
        let bg = self.bg;
        if let Some(fb) = self.fb.as_mut() {
            fb.clear(bg);
        }
    }

    /// Takes effect from the next character on; what is already on screen
    /// stays.
    pub fn set_font_size(&mut self, size: FontSize) {
        if size == self.font {
            return;
        }
        self.font = size;
        let (cols, rows) = self.grid();
        if self.col >= cols || self.row >= rows {
            self.newline();
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.fb.is_none() {
            use core::fmt::Write;
            let mut serial = crate::serial::SERIAL.lock();
            for &b in bytes {
                let _ = serial.write_char(b as char);
            }
            return;
        }
        for &b in bytes {
            self.write_byte(b);
        }
    }

    pub fn write_byte(&mut self, byte: u8) {
        let (cols, _) = self.grid();
        match byte {
            b'\n' => self.newline(),
            b'\r' => self.col = 0,
            0x08 => self.backspace(),
            b'\t' => {
                let next = (self.col / TAB_WIDTH + 1) * TAB_WIDTH;
                while self.col < next.min(cols) {
                    self.write_byte(b' ');
                }
            }
            _ => {
                if self.col >= cols {
                    self.newline();
                }
                let (cw, ch) = self.font.cell();
                let (x, y) = ((self.col * cw) as i32, (self.row * ch) as i32);
                let style = self.style(self.fg);
                if let Some(fb) = self.fb.as_mut() {
                    fb.draw_char(printable(byte), x, y, style);
                }
                self.col += 1;
            }
        }
    }

    fn backspace(&mut self) {
        let (cols, _) = self.grid();
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = cols - 1;
        } else {
            return;
        }
        let (cw, ch) = self.font.cell();
        let (x, y) = ((self.col * cw) as i32, (self.row * ch) as i32);
        let bg = self.bg;
        if let Some(fb) = self.fb.as_mut() {
            fb.fill_rect(x as i64, y as i64, cw as u64, ch as u64, bg);
        }
    }

    fn newline(&mut self) {
        let (_, rows) = self.grid();
        self.col = 0;
        if self.row + 1 < rows {
            self.row += 1;
            return;
        }
        let (_, ch) = self.font.cell();
        let bg = self.bg;
        if let Some(fb) = self.fb.as_mut() {
            fb.scroll_up(ch, bg);
        }
    }

    /// Draw `c` with its top-left corner at pixel (`x`, `y`). Does not move
    /// the text cursor.
    pub fn put_char(&mut self, c: u8, x: u32, y: u32, color: Color) {
        let style = self.style(color);
        if let Some(fb) = self.fb.as_mut() {
            fb.draw_char(printable(c), x as i32, y as i32, style);
        }
    }

    /// Anything off screen is clipped away.
    pub fn draw_rect(&mut self, color: Color, x: u64, y: u64, width: u64, height: u64) {
        if let Some(fb) = self.fb.as_mut() {
            let x = i64::try_from(x).unwrap_or(i64::MAX);
            let y = i64::try_from(y).unwrap_or(i64::MAX);
            fb.fill_rect(x, y, width, height, color);
        }
    }

    /// Write in `color`, then go back to the default foreground.
    pub fn write_colored(&mut self, color: Color, s: &str) {
        self.fg = color;
        self.write_bytes(s.as_bytes());
        self.fg = DEFAULT_FG;
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

fn printable(byte: u8) -> char {
    if byte.is_ascii() { byte as char } else { '?' }
}

pub static CONSOLE: Mutex<Console> = Mutex::new(Console::new());

pub fn with_console<R>(f: impl FnOnce(&mut Console) -> R) -> R {
    x86_64::instructions::interrupts::without_interrupts(|| f(&mut CONSOLE.lock()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_levels_map_to_the_three_sizes() {
        assert_eq!(FontSize::from_level(1).map(FontSize::cell), Some((6, 10)));
        assert_eq!(FontSize::from_level(2).map(FontSize::cell), Some((8, 13)));
        assert_eq!(FontSize::from_level(3).map(FontSize::cell), Some((10, 20)));
        assert_eq!(FontSize::from_level(0), None);
        assert_eq!(FontSize::from_level(4), None);
    }
}
