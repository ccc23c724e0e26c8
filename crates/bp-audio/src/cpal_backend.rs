//! CPAL-based audio output backend.

use bp_engine::SharedEngine;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
///
/// The device callback renders straight from the shared engine. Dropping
/// the output tears the stream down; no callback fires afterwards.
pub struct CpalOutput {
    config: StreamConfig,
    stream: Option<Stream>,
}

impl CpalOutput {
    /// Open the default output device and build a stream that renders `engine`.
    ///
    /// The engine is switched to the device's sample rate before the stream
    /// exists. The stream starts paused; call [`AudioOutput::start`].
    pub fn open(engine: SharedEngine, channels: u16) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        config.channels = channels.max(1);

        engine
            .lock()
            .map_err(|_| AudioError::DeviceInit("engine lock poisoned".to_string()))?
            .set_sample_rate(config.sample_rate.0);

        let stream = build_stream(&device, &config, engine)?;
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio stream created"
        );

        Ok(Self {
            config,
            stream: Some(stream),
        })
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    engine: SharedEngine,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // The owner only locks while no stream exists, so this
                // succeeds in practice; contention yields a silent buffer.
                match engine.try_lock() {
                    Ok(mut engine) => engine.render(data, channels),
                    Err(_) => data.fill(0.0),
                }
            },
            |err| tracing::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

    stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
    Ok(stream)
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn channels(&self) -> usize {
        self.config.channels as usize
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
            tracing::debug!("audio stream closed");
        }
    }
}
