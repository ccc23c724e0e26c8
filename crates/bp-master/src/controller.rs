use std::path::Path;
use std::sync::Arc;

use bp_audio::{AudioDevice, AudioOutput};
use bp_engine::{command_queue, current_step, CommandSender, Engine, EngineCommand, SharedEngine, Transport};
use bp_ir::{Composition, StepSettings};

use crate::config::BeeperConfig;
use crate::error::Result;
use crate::export::{self, ExportReport};

/// Headless synth controller: owns the engine and the audio device.
///
/// Keeps its own copy of the composition for display. Edits land in that
/// copy immediately and reach the engine through the command queue.
pub struct Controller {
    composition: Composition,
    engine: SharedEngine,
    transport: Arc<Transport>,
    commands: CommandSender,
    device: Option<AudioDevice>,
    sample_rate: u32,
    config: BeeperConfig,
    /// Track gains after the config weights, restored on unmute.
    mix_gains: Vec<f32>,
}

impl Controller {
    /// Build a stopped controller with no audio device yet.
    ///
    /// The config's mix weights replace the composition's track gains.
    pub fn new(mut composition: Composition, config: BeeperConfig) -> Result<Self> {
        composition.validate()?;
        composition.apply_weights(&config.mix.weights);

        let sample_rate = config.audio.sample_rate;
        let (commands, receiver) = command_queue();
        let mut engine = Engine::new(&composition, sample_rate).with_commands(receiver);
        engine.set_master_gain(config.mix.master_gain);
        let transport = engine.transport();
        let mix_gains = composition.tracks.iter().map(|t| t.gain).collect();

        Ok(Self {
            composition,
            engine: engine.into_shared(),
            transport,
            commands,
            device: None,
            sample_rate,
            config,
            mix_gains,
        })
    }

    // --- Composition ---

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn config(&self) -> &BeeperConfig {
        &self.config
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Change one step. Returns false if the slot does not exist.
    pub fn set_step(&mut self, track: usize, step: usize, settings: StepSettings) -> bool {
        if !self.composition.set_step(track, step, settings) {
            return false;
        }
        self.send(EngineCommand::SetStep {
            track,
            step,
            settings,
        });
        true
    }

    pub fn set_gain(&mut self, track: usize, gain: f32) -> bool {
        let Some(spec) = self.composition.tracks.get_mut(track) else {
            return false;
        };
        spec.gain = gain;
        self.send(EngineCommand::SetGain { track, gain });
        true
    }

    /// Silence a track, or restore its mix gain. Returns whether the track is
    /// now muted, or `None` if it does not exist.
    pub fn toggle_mute(&mut self, track: usize) -> Option<bool> {
        let muted = self.composition.tracks.get(track)?.gain != 0.0;
        let gain = if muted { 0.0 } else { self.mix_gains[track] };
        self.set_gain(track, gain);
        tracing::debug!(track, muted, "track mute toggled");
        Some(muted)
    }

    fn send(&mut self, command: EngineCommand) {
        if let Err(dropped) = self.commands.send(command) {
            tracing::warn!(?dropped, "edit queue full, edit dropped");
        }
    }

    // --- Transport ---

    pub fn play(&self) {
        self.transport.set_playing(true);
    }

    pub fn pause(&self) {
        self.transport.set_playing(false);
    }

    pub fn toggle(&self) {
        self.transport.set_playing(!self.transport.is_playing());
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Back to the first step on the next render.
    pub fn rewind(&mut self) {
        self.send(EngineCommand::Rewind);
    }

    /// Sample counter last published by the engine.
    pub fn position(&self) -> u64 {
        self.transport.position()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_per_step(&self) -> u64 {
        self.composition.samples_per_step(self.sample_rate) as u64
    }

    pub fn current_step(&self) -> usize {
        self.step_at(self.position())
    }

    pub fn step_at(&self, position: u64) -> usize {
        current_step(position, self.samples_per_step(), self.composition.step_count)
    }

    // --- Audio device ---

    /// Open the configured backend. Does nothing if a device is already open.
    pub fn start_audio(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }
        let device = AudioDevice::open(
            self.config.audio.backend.into(),
            &self.engine,
            self.config.audio.channels,
            self.config.audio.sample_rate,
        )?;
        self.sample_rate = device.sample_rate();
        tracing::info!(sample_rate = self.sample_rate, channels = device.channels(), "audio started");
        self.device = Some(device);
        Ok(())
    }

    /// Tear the device down. No callback runs after this returns.
    pub fn stop_audio(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop() {
                tracing::warn!("stopping audio: {e}");
            }
            drop(device);
            tracing::debug!("audio stopped");
        }
    }

    pub fn has_audio(&self) -> bool {
        self.device.is_some()
    }

    pub fn device_mut(&mut self) -> Option<&mut AudioDevice> {
        self.device.as_mut()
    }

    // --- Offline rendering ---

    /// Render the configured number of loops to an audio file. The format
    /// follows the extension: `.wav` is written directly, anything else goes
    /// through the configured ffmpeg.
    pub fn render_to_file(&self, path: &Path) -> Result<ExportReport> {
        export::render_audio_file(&self.composition, &self.config, path)
    }

    /// Export audio and video to the configured files. Stops playback first.
    pub fn export(&mut self) -> Result<ExportReport> {
        self.pause();
        export::export_to_files(&self.composition, &self.config)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_audio();
    }
}
