//! Host side of the renderer table: record the module's calls, replay
//! them into imgui's background draw list.

use std::ffi::c_void;

use bp_ir::{Color, DrawCommand, Rect, RendererTable};

/// Commands recorded during one module `update`.
#[derive(Debug, Default)]
pub struct DrawBuffer {
    clear: Color,
    commands: Vec<DrawCommand>,
}

impl DrawBuffer {
    pub fn boxed() -> Box<Self> {
        Box::default()
    }

    /// Table whose callbacks write into this buffer.
    ///
    /// The buffer must not move while the table is in use; keep it boxed.
    pub fn renderer(&mut self) -> RendererTable {
        RendererTable {
            user: (self as *mut DrawBuffer).cast(),
            begin_frame,
            end_frame,
            draw_rect,
            draw_text,
            draw_texture,
        }
    }

    pub fn clear_color(&self) -> Color {
        self.clear
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Draw the recorded commands behind every imgui window.
    pub fn replay(&self, ui: &imgui::Ui) {
        let list = ui.get_background_draw_list();
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => {
                    let size = ui.io().display_size;
                    list.add_rect([0.0, 0.0], size, to_imgui(*color))
                        .filled(true)
                        .build();
                }
                DrawCommand::Rect { rect, color } => {
                    if rect.w <= 0.0 || rect.h <= 0.0 {
                        continue;
                    }
                    list.add_rect([rect.x, rect.y], [rect.x + rect.w, rect.y + rect.h], to_imgui(*color))
                        .filled(true)
                        .build();
                }
                // imgui draws every string at the current font size.
                DrawCommand::Text { text, x, y, color, .. } => {
                    list.add_text([*x, *y], to_imgui(*color), text);
                }
                DrawCommand::Texture {
                    rect,
                    width,
                    height,
                    rgba,
                } => {
                    for (run, color) in texture_runs(*rect, *width, *height, rgba) {
                        list.add_rect([run.x, run.y], [run.x + run.w, run.y + run.h], to_imgui(color))
                            .filled(true)
                            .build();
                    }
                }
            }
        }
    }
}

/// Split an image into horizontal runs of one color, scaled onto `dest`.
///
/// Scene frames are flat fills, so a frame collapses to a few hundred
/// rectangles. Fully transparent pixels are skipped.
pub fn texture_runs(dest: Rect, width: u32, height: u32, rgba: &[u8]) -> Vec<(Rect, Color)> {
    let mut runs = Vec::new();
    if width == 0 || height == 0 || rgba.len() < DrawCommand::texture_len(width, height) {
        return runs;
    }
    let (sx, sy) = (dest.w / width as f32, dest.h / height as f32);
    let pixel = |i: usize| Color::rgba(rgba[i * 4], rgba[i * 4 + 1], rgba[i * 4 + 2], rgba[i * 4 + 3]);
    for row in 0..height as usize {
        let base = row * width as usize;
        let mut start = 0;
        while start < width as usize {
            let color = pixel(base + start);
            let mut end = start + 1;
            while end < width as usize && pixel(base + end) == color {
                end += 1;
            }
            if color.a != 0 {
                let rect = Rect::new(
                    dest.x + start as f32 * sx,
                    dest.y + row as f32 * sy,
                    (end - start) as f32 * sx,
                    sy,
                );
                runs.push((rect, color));
            }
            start = end;
        }
    }
    runs
}

pub fn to_imgui(color: Color) -> [f32; 4] {
    [
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        color.a as f32 / 255.0,
    ]
}

/// # Safety
/// `user` is the `DrawBuffer` pointer stored by [`DrawBuffer::renderer`].
unsafe fn buffer<'a>(user: *mut c_void) -> Option<&'a mut DrawBuffer> {
    user.cast::<DrawBuffer>().as_mut()
}

extern "C" fn begin_frame(user: *mut c_void, clear: Color) {
    // SAFETY: see `buffer`.
    if let Some(buf) = unsafe { buffer(user) } {
        buf.clear = clear;
        buf.commands.clear();
    }
}

extern "C" fn end_frame(_user: *mut c_void) {}

extern "C" fn draw_rect(user: *mut c_void, rect: Rect, color: Color) {
    // SAFETY: see `buffer`.
    if let Some(buf) = unsafe { buffer(user) } {
        buf.commands.push(DrawCommand::Rect { rect, color });
    }
}

extern "C" fn draw_text(
    user: *mut c_void,
    text: *const u8,
    len: usize,
    x: f32,
    y: f32,
    size: f32,
    color: Color,
) {
    if text.is_null() {
        return;
    }
    // SAFETY: see `buffer`.
    let Some(buf) = (unsafe { buffer(user) }) else {
        return;
    };
    // SAFETY: the module passes the pointer and length of a live `str`.
    let bytes = unsafe { std::slice::from_raw_parts(text, len) };
    buf.commands.push(DrawCommand::Text {
        text: String::from_utf8_lossy(bytes).into_owned(),
        x,
        y,
        size,
        color,
    });
}

extern "C" fn draw_texture(user: *mut c_void, rgba: *const u8, width: u32, height: u32, dest: Rect) {
    if rgba.is_null() {
        return;
    }
    // SAFETY: see `buffer`.
    let Some(buf) = (unsafe { buffer(user) }) else {
        return;
    };
    // SAFETY: the module passes `width * height * 4` live bytes.
    let bytes = unsafe { std::slice::from_raw_parts(rgba, DrawCommand::texture_len(width, height)) };
    buf.commands.push(DrawCommand::Texture {
        rect: dest,
        width,
        height,
        rgba: bytes.to_vec(),
    });
}
