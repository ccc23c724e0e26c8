//! C ABI between the reload host and the module.
//!
//! The module exports exactly five `extern "C"` functions named by the
//! `*_SYMBOL` constants. Every call receives the same [`HostContext`], which
//! carries the module's opaque state pointer, the frame's input, and the
//! host's renderer. Across a reload the state travels inside a versioned
//! [`StateHandoff`] so the new code image can check it before adopting it.

use core::ffi::c_void;

use crate::draw::{Color, DrawCommand, Rect};

pub const INIT_SYMBOL: &[u8] = b"beeper_init\0";
pub const UPDATE_SYMBOL: &[u8] = b"beeper_update\0";
pub const CLEANUP_SYMBOL: &[u8] = b"beeper_cleanup\0";
pub const PRE_RELOAD_SYMBOL: &[u8] = b"beeper_pre_reload\0";
pub const POST_RELOAD_SYMBOL: &[u8] = b"beeper_post_reload\0";

/// Allocate module state and start audio. Returns [`STATUS_OK`] or a failure code.
pub type InitFn = unsafe extern "C" fn(ctx: *mut HostContext) -> u32;
/// Advance one frame and draw.
pub type UpdateFn = unsafe extern "C" fn(ctx: *mut HostContext);
/// Release audio and free module state.
pub type CleanupFn = unsafe extern "C" fn(ctx: *mut HostContext);
/// Release volatile resources and hand the state out.
pub type PreReloadFn = unsafe extern "C" fn(ctx: *mut HostContext) -> StateHandoff;
/// Adopt a handoff and recreate volatile resources. Returns [`STATUS_OK`] or a
/// [`HandoffError::code`].
pub type PostReloadFn = unsafe extern "C" fn(ctx: *mut HostContext, handoff: StateHandoff) -> u32;

pub const STATUS_OK: u32 = 0;
/// `init` could not open the audio device.
pub const STATUS_AUDIO_INIT_FAILED: u32 = 16;
/// `init` could not load its configuration.
pub const STATUS_CONFIG_FAILED: u32 = 17;

/// Key bits reported in [`FrameInput::keys_pressed`].
pub mod keys {
    pub const SPACE: u32 = 1 << 0;
    pub const R: u32 = 1 << 1;
    pub const E: u32 = 1 << 2;
    pub const P: u32 = 1 << 3;
    pub const Q: u32 = 1 << 4;
    pub const ONE: u32 = 1 << 5;
    pub const TWO: u32 = 1 << 6;
    pub const THREE: u32 = 1 << 7;

    /// Keys that mute tracks 0, 1 and 2.
    pub const TRACK_MUTE: [u32; 3] = [ONE, TWO, THREE];
}

/// Input and window metrics for one frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub width: f32,
    pub height: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub pointer_down: bool,
    /// Keys pressed this frame, see [`keys`].
    pub keys_pressed: u32,
}

impl FrameInput {
    pub fn pressed(&self, key: u32) -> bool {
        self.keys_pressed & key != 0
    }
}

/// Immediate-mode drawing functions provided by the host.
///
/// `user` is passed back unchanged to every call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RendererTable {
    pub user: *mut c_void,
    pub begin_frame: extern "C" fn(user: *mut c_void, clear: Color),
    pub end_frame: extern "C" fn(user: *mut c_void),
    pub draw_rect: extern "C" fn(user: *mut c_void, rect: Rect, color: Color),
    pub draw_text:
        extern "C" fn(user: *mut c_void, text: *const u8, len: usize, x: f32, y: f32, size: f32, color: Color),
    /// `rgba` points at `width * height * 4` bytes, valid for the call only.
    pub draw_texture: extern "C" fn(user: *mut c_void, rgba: *const u8, width: u32, height: u32, dest: Rect),
}

impl RendererTable {
    /// A renderer that ignores everything.
    pub fn discard() -> Self {
        extern "C" fn begin(_: *mut c_void, _: Color) {}
        extern "C" fn end(_: *mut c_void) {}
        extern "C" fn rect(_: *mut c_void, _: Rect, _: Color) {}
        extern "C" fn text(_: *mut c_void, _: *const u8, _: usize, _: f32, _: f32, _: f32, _: Color) {}
        extern "C" fn texture(_: *mut c_void, _: *const u8, _: u32, _: u32, _: Rect) {}
        Self {
            user: core::ptr::null_mut(),
            begin_frame: begin,
            end_frame: end,
            draw_rect: rect,
            draw_text: text,
            draw_texture: texture,
        }
    }

    /// Submit a frame of commands, bracketed by begin/end.
    ///
    /// A leading `Clear` becomes the frame's clear color.
    pub fn submit(&self, commands: &[DrawCommand]) {
        let (clear, rest) = match commands.split_first() {
            Some((DrawCommand::Clear(color), rest)) => (*color, rest),
            _ => (Color::BLACK, commands),
        };
        (self.begin_frame)(self.user, clear);
        for command in rest {
            match command {
                DrawCommand::Clear(color) => {
                    (self.draw_rect)(self.user, Rect::new(0.0, 0.0, f32::MAX, f32::MAX), *color)
                }
                DrawCommand::Rect { rect, color } => (self.draw_rect)(self.user, *rect, *color),
                DrawCommand::Text {
                    text,
                    x,
                    y,
                    size,
                    color,
                } => (self.draw_text)(self.user, text.as_ptr(), text.len(), *x, *y, *size, *color),
                DrawCommand::Texture {
                    rect,
                    width,
                    height,
                    rgba,
                } => {
                    // A short buffer would let the host read past the end.
                    if rgba.len() >= DrawCommand::texture_len(*width, *height) {
                        (self.draw_texture)(self.user, rgba.as_ptr(), *width, *height, *rect);
                    }
                }
            }
        }
        (self.end_frame)(self.user);
    }
}

/// Everything the host passes to the module on every call.
#[repr(C)]
pub struct HostContext {
    /// Module-owned state. The host never dereferences it.
    pub state: *mut c_void,
    pub input: FrameInput,
    pub renderer: RendererTable,
    /// Set by the module to ask the host to exit after this frame.
    pub quit_requested: bool,
}

impl HostContext {
    pub fn new(renderer: RendererTable) -> Self {
        Self {
            state: core::ptr::null_mut(),
            input: FrameInput::default(),
            renderer,
            quit_requested: false,
        }
    }
}

/// "BEEP" in ASCII.
pub const HANDOFF_MAGIC: u32 = u32::from_be_bytes(*b"BEEP");

/// Module state in transit between two code images.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateHandoff {
    pub magic: u32,
    pub version: u32,
    pub size: usize,
    pub align: usize,
    pub state: *mut c_void,
}

/// Reasons a module refuses a [`StateHandoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    #[error("handoff magic {0:#010x} is not a beeper state")]
    BadMagic(u32),
    #[error("state version {found} does not match module version {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("state layout {found_size}/{found_align} does not match module layout {expected_size}/{expected_align}")]
    LayoutMismatch {
        expected_size: usize,
        expected_align: usize,
        found_size: usize,
        found_align: usize,
    },
    #[error("handoff carries no state")]
    NullState,
}

impl HandoffError {
    /// Status code returned from `post_reload`.
    pub fn code(&self) -> u32 {
        match self {
            HandoffError::BadMagic(_) => 1,
            HandoffError::VersionMismatch { .. } => 2,
            HandoffError::LayoutMismatch { .. } => 3,
            HandoffError::NullState => 4,
        }
    }

    /// Human-readable reason for a status code, for the host's diagnostic.
    pub fn describe_code(code: u32) -> &'static str {
        match code {
            STATUS_OK => "ok",
            1 => "bad handoff magic",
            2 => "state version mismatch",
            3 => "state layout mismatch",
            4 => "null state",
            STATUS_AUDIO_INIT_FAILED => "audio device initialisation failed",
            STATUS_CONFIG_FAILED => "configuration could not be loaded",
            _ => "unknown module status",
        }
    }
}

impl StateHandoff {
    pub fn new(version: u32, size: usize, align: usize, state: *mut c_void) -> Self {
        Self {
            magic: HANDOFF_MAGIC,
            version,
            size,
            align,
            state,
        }
    }

    /// Handoff describing state of type `T`.
    pub fn of<T>(version: u32, state: *mut T) -> Self {
        Self::new(
            version,
            core::mem::size_of::<T>(),
            core::mem::align_of::<T>(),
            state.cast(),
        )
    }

    /// Handoff returned when there is no state to carry.
    pub fn empty() -> Self {
        Self::new(0, 0, 0, core::ptr::null_mut())
    }

    /// Check that this handoff carries a `T` written by a compatible module.
    pub fn validate<T>(&self, version: u32) -> Result<*mut T, HandoffError> {
        if self.magic != HANDOFF_MAGIC {
            return Err(HandoffError::BadMagic(self.magic));
        }
        if self.state.is_null() {
            return Err(HandoffError::NullState);
        }
        if self.version != version {
            return Err(HandoffError::VersionMismatch {
                expected: version,
                found: self.version,
            });
        }
        let (size, align) = (core::mem::size_of::<T>(), core::mem::align_of::<T>());
        if self.size != size || self.align != align {
            return Err(HandoffError::LayoutMismatch {
                expected_size: size,
                expected_align: align,
                found_size: self.size,
                found_align: self.align,
            });
        }
        Ok(self.state.cast())
    }
}
