//! Synthesis engine for the beeper synth.
//!
//! Turns a [`bp_ir::Composition`] into audio: oscillators, per-track phase
//! accumulators, the step sequencer, and the render callback that fills
//! device buffers.

mod command;
mod frame;
mod mixer;
pub mod oscillator;
mod sequencer;
mod track;
mod transport;

pub use command::{command_queue, CommandReceiver, CommandSender, EngineCommand, COMMAND_QUEUE_CAPACITY};
pub use frame::Frame;
pub use mixer::{Engine, SharedEngine};
pub use sequencer::{current_step, Sequencer};
pub use track::{PhaseSet, Track};
pub use transport::Transport;
