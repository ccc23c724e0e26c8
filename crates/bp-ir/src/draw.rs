//! Immediate-mode draw commands.

use alloc::string::String;
use alloc::vec::Vec;

/// 8-bit RGBA color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Axis-aligned rectangle in pixels, origin top-left.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// One drawing operation, executed in order.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole target.
    Clear(Color),
    Rect { rect: Rect, color: Color },
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
    },
    /// RGBA8 image of `width * height` pixels, stretched over `rect`.
    Texture {
        rect: Rect,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
}

impl DrawCommand {
    /// Bytes a texture of this size must carry.
    pub fn texture_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}
