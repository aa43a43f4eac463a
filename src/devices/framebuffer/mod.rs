//! # Framebuffer Graphics Module
//!
//! Linear framebuffer handed over by the bootloader, drawn with
//! `embedded-graphics` primitives and mono fonts.
//!
//! - `framebuffer`: `FramebufferWriter`, a `DrawTarget` over the raw pixels
//! - `color`: `Color` and the `0xRRGGBB` conversion used by syscalls

pub mod framebuffer;
pub mod color;
