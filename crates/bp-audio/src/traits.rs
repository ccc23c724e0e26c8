//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("Device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("Stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("Playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("No audio device available")]
    NoDevice,
}

/// Trait for audio output backends.
///
/// A backend pulls samples from a shared engine through its own callback;
/// this trait only covers the device lifecycle.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Interleaved channel count of the device buffer.
    fn channels(&self) -> usize;

    /// Start pulling from the engine.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop pulling from the engine. No callback runs after this returns.
    fn stop(&mut self) -> Result<(), AudioError>;
}
