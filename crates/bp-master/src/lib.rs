//! Headless controller for the beeper synth.
//!
//! Provides a unified API for playback, step edits, configuration and
//! offline export that the module, the CLI and the tests share.

pub mod config;
mod controller;
mod error;
pub mod export;
pub mod raster;
pub mod scene;
mod wav;

pub use config::{BackendKind, BeeperConfig};
pub use controller::Controller;
pub use error::{MasterError, Result};
pub use export::{ExportReport, ExportSettings, FrameClock};
pub use scene::{build_scene, GridLayout, SceneView, StepHit};

// Re-export common types so callers don't need bp-ir/bp-engine directly.
pub use bp_audio::{AudioDevice, AudioOutput};
pub use bp_ir::{Composition, StepSettings, TrackRole};
