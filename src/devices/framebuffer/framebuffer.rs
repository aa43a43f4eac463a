//! Framebuffer writer using embedded-graphics
use bootloader_api::info::{FrameBuffer, PixelFormat};
use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use embedded_graphics_core::{draw_target::DrawTarget, geometry::OriginDimensions, Pixel};

use super::color::Color;

pub struct FramebufferWriter {
    framebuffer: &'static mut [u8],
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub bytes_per_pixel: usize,
    format: PixelFormat,
}

impl FramebufferWriter {
    pub fn new(fb: &'static mut FrameBuffer) -> Self {
        let info = fb.info();
        Self {
            width: info.width,
            height: info.height,
            stride: info.stride,
            bytes_per_pixel: info.bytes_per_pixel,
            format: info.pixel_format,
            framebuffer: fb.buffer_mut(),
        }
    }

    /// Fill entire screen with a color
    pub fn clear(&mut self, color: Color) {
        self.fill_rect(0, 0, self.width as u64, self.height as u64, color);
    }

    /// Fill a rectangular region, clipped to the screen
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u64, height: u64, color: Color) {
        let Some(area) = clip_rect(x, y, width, height, self.width, self.height) else {
            return;
        };
        area.into_styled(PrimitiveStyle::with_fill(color.to_rgb888()))
            .draw(self)
            .ok();
    }

    /// Draw a single character with its top-left corner at pixel coordinates
    pub fn draw_char(&mut self, ch: char, x: i32, y: i32, style: MonoTextStyle<'_, Rgb888>) {
        let mut buf = [0u8; 4];
        let s = ch.encode_utf8(&mut buf);
        Text::with_baseline(s, Point::new(x, y), style, Baseline::Top)
            .draw(self)
            .ok();
    }

    /// Move everything up by `rows` pixel rows and blank the freed strip.
    pub fn scroll_up(&mut self, rows: usize, fill: Color) {
        let rows = rows.min(self.height);
        let line = self.stride * self.bytes_per_pixel;
        let visible = (self.height * line).min(self.framebuffer.len());
        self.framebuffer.copy_within(rows * line..visible, 0);
        let top = (self.height - rows) as i64;
        self.fill_rect(0, top, self.width as u64, rows as u64, fill);
    }

    fn write_pixel(&mut self, x: usize, y: usize, color: Rgb888) {
        let offset = (y * self.stride + x) * self.bytes_per_pixel;
        let Some(px) = self.framebuffer.get_mut(offset..offset + self.bytes_per_pixel) else {
            return;
        };
        match self.format {
            PixelFormat::Rgb => {
                px[0] = color.r();
                px[1] = color.g();
                px[2] = color.b();
            }
            PixelFormat::U8 => {
                px[0] = ((color.r() as u16 + color.g() as u16 + color.b() as u16) / 3) as u8;
            }
            _ => {
                px[0] = color.b();
                px[1] = color.g();
                px[2] = color.r();
            }
        }
        if self.bytes_per_pixel == 4 {
            px[3] = 255;
        }
    }
}

impl DrawTarget for FramebufferWriter {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
                continue;
            }
            self.write_pixel(x as usize, y as usize, color);
        }
        Ok(())
    }
}

impl OriginDimensions for FramebufferWriter {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

/// The part of a `width` x `height` rectangle at (`x`, `y`) that lies on a
/// `screen_width` x `screen_height` screen, or `None` if nothing does.
pub fn clip_rect(
    x: i64,
    y: i64,
    width: u64,
    height: u64,
    screen_width: usize,
    screen_height: usize,
) -> Option<Rectangle> {
    let left = x.max(0);
    let top = y.max(0);
    let right = x.saturating_add_unsigned(width).min(screen_width as i64);
    let bottom = y.saturating_add_unsigned(height).min(screen_height as i64);
    if left >= right || top >= bottom {
        return None;
    }
    Some(Rectangle::new(
        Point::new(left as i32, top as i32),
        Size::new((right - left) as u32, (bottom - top) as u32),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle::new(Point::new(x, y), Size::new(w, h))
    }

    #[test]
    fn on_screen_rectangle_is_unchanged() {
        assert_eq!(clip_rect(10, 20, 30, 40, 800, 600), Some(rect(10, 20, 30, 40)));
    }

    #[test]
    fn huge_rectangle_is_cut_to_the_screen() {
        assert_eq!(clip_rect(0, 0, u64::MAX, u64::MAX, 800, 600), Some(rect(0, 0, 800, 600)));
        assert_eq!(
            clip_rect(700, 500, u32::MAX as u64, u32::MAX as u64, 800, 600),
            Some(rect(700, 500, 100, 100))
        );
        assert_eq!(clip_rect(-5, -5, 10, 10, 800, 600), Some(rect(0, 0, 5, 5)));
    }

    #[test]
    fn off_screen_or_empty_rectangle_draws_nothing() {
        assert_eq!(clip_rect(800, 0, 10, 10, 800, 600), None);
        assert_eq!(clip_rect(0, u32::MAX as i64, 10, 10, 800, 600), None);
        assert_eq!(clip_rect(10, 10, 0, 10, 800, 600), None);
        assert_eq!(clip_rect(i64::MAX, 0, u64::MAX, 10, 800, 600), None);
    }
}
