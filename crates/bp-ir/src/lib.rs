//! Core data types for the beeper synth.
//!
//! This crate defines the step tables and compositions the engine plays,
//! the draw commands the module emits, and the C ABI shared between the
//! reload host and the hot-swappable module.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod abi;
mod composition;
mod draw;
mod step;

pub use abi::{keys, FrameInput, HandoffError, HostContext, RendererTable, StateHandoff};
pub use composition::{Composition, CompositionError, TrackRole, TrackSpec};
pub use draw::{Color, DrawCommand, Rect};
pub use step::{note_to_hz, StepSettings};
