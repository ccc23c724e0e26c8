//! Software rasterizer for export frames.

use bp_ir::{Color, DrawCommand, Rect};

/// RGBA8 pixel buffer, rows top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, `width * height * 4` long.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    pub fn clear(&mut self, color: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    /// Fill `rect`, clipped to the canvas. Translucent colors blend over
    /// what is already there.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.a == 0 {
            return;
        }
        let x0 = rect.x.max(0.0).round() as usize;
        let y0 = rect.y.max(0.0).round() as usize;
        let x1 = ((rect.x + rect.w).round().max(0.0) as usize).min(self.width as usize);
        let y1 = ((rect.y + rect.h).round().max(0.0) as usize).min(self.height as usize);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let stride = self.width as usize * 4;
        for y in y0..y1 {
            let row = &mut self.pixels[y * stride + x0 * 4..y * stride + x1 * 4];
            for px in row.chunks_exact_mut(4) {
                blend(px, color);
            }
        }
    }

    /// Stretch an RGBA image over `rect` with nearest-neighbour sampling.
    pub fn blit(&mut self, rect: Rect, width: u32, height: u32, rgba: &[u8]) {
        if width == 0 || height == 0 || rgba.len() < DrawCommand::texture_len(width, height) {
            return;
        }
        let x0 = rect.x.max(0.0).round() as usize;
        let y0 = rect.y.max(0.0).round() as usize;
        let x1 = ((rect.x + rect.w).round().max(0.0) as usize).min(self.width as usize);
        let y1 = ((rect.y + rect.h).round().max(0.0) as usize).min(self.height as usize);
        if x0 >= x1 || y0 >= y1 || rect.w <= 0.0 || rect.h <= 0.0 {
            return;
        }
        let stride = self.width as usize * 4;
        for y in y0..y1 {
            let v = (((y as f32 + 0.5 - rect.y) / rect.h) * height as f32) as usize;
            let src_row = v.min(height as usize - 1) * width as usize;
            for x in x0..x1 {
                let u = (((x as f32 + 0.5 - rect.x) / rect.w) * width as f32) as usize;
                let i = (src_row + u.min(width as usize - 1)) * 4;
                let color = Color::rgba(rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]);
                if color.a != 0 {
                    blend(&mut self.pixels[y * stride + x * 4..y * stride + x * 4 + 4], color);
                }
            }
        }
    }

    /// Execute draw commands in order. Text is not rasterized.
    pub fn draw(&mut self, commands: &[DrawCommand]) {
        for command in commands {
            match command {
                DrawCommand::Clear(color) => self.clear(*color),
                DrawCommand::Rect { rect, color } => self.fill_rect(*rect, *color),
                DrawCommand::Text { .. } => {}
                DrawCommand::Texture {
                    rect,
                    width,
                    height,
                    rgba,
                } => self.blit(*rect, *width, *height, rgba),
            }
        }
    }

    /// Take the pixels as a texture command covering `rect`.
    pub fn into_texture(self, rect: Rect) -> DrawCommand {
        DrawCommand::Texture {
            rect,
            width: self.width,
            height: self.height,
            rgba: self.pixels,
        }
    }
}

fn blend(px: &mut [u8], color: Color) {
    if color.a == 255 {
        px.copy_from_slice(&[color.r, color.g, color.b, 255]);
        return;
    }
    let a = color.a as u32;
    let mix = |dst: u8, src: u8| ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8;
    px[0] = mix(px[0], color.r);
    px[1] = mix(px[1], color.g);
    px[2] = mix(px[2], color.b);
    px[3] = 255;
}
