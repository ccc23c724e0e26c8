//! Audio output backends for the beeper synth.

mod cpal_backend;
mod null_backend;
mod traits;

use bp_engine::SharedEngine;

pub use cpal_backend::CpalOutput;
pub use null_backend::NullOutput;
pub use traits::{AudioError, AudioOutput};

/// Which backend to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Cpal,
    Null,
}

/// An open output of either backend.
///
/// An enum rather than a boxed trait object: the owning state outlives the
/// code image that built it, so it must not hold vtable pointers.
pub enum AudioDevice {
    Cpal(CpalOutput),
    Null(NullOutput),
}

impl AudioDevice {
    /// Open and start a device rendering `engine`.
    ///
    /// `null_rate` is the sample rate given to the null backend, which has
    /// no hardware to ask.
    pub fn open(
        backend: Backend,
        engine: &SharedEngine,
        channels: u16,
        null_rate: u32,
    ) -> Result<Self, AudioError> {
        let mut device = match backend {
            Backend::Cpal => AudioDevice::Cpal(CpalOutput::open(engine.clone(), channels)?),
            Backend::Null => AudioDevice::Null(NullOutput::new(engine.clone(), null_rate, channels)?),
        };
        device.start()?;
        Ok(device)
    }

    pub fn as_null_mut(&mut self) -> Option<&mut NullOutput> {
        match self {
            AudioDevice::Null(null) => Some(null),
            AudioDevice::Cpal(_) => None,
        }
    }

    fn output(&mut self) -> &mut dyn AudioOutput {
        match self {
            AudioDevice::Cpal(out) => out,
            AudioDevice::Null(out) => out,
        }
    }
}

impl AudioOutput for AudioDevice {
    fn sample_rate(&self) -> u32 {
        match self {
            AudioDevice::Cpal(out) => out.sample_rate(),
            AudioDevice::Null(out) => out.sample_rate(),
        }
    }

    fn channels(&self) -> usize {
        match self {
            AudioDevice::Cpal(out) => out.channels(),
            AudioDevice::Null(out) => out.channels(),
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.output().start()
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.output().stop()
    }
}
