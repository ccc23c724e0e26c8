//! Main synthesis engine and the real-time render callback.

use std::sync::{Arc, Mutex};

use bp_ir::Composition;

use crate::command::{CommandReceiver, EngineCommand};
use crate::sequencer::Sequencer;
use crate::track::Track;
use crate::transport::Transport;

/// Engine shared between its owner and an audio device callback.
///
/// The callback only ever `try_lock`s; the owner locks while no stream is
/// running (device setup, reload, offline rendering).
pub type SharedEngine = Arc<Mutex<Engine>>;

/// The synthesis engine: tracks, sequencer and the running sample counter.
#[derive(Debug)]
pub struct Engine {
    /// Voices, in mix order
    tracks: Vec<Track>,
    /// Step timing at the current sample rate
    sequencer: Sequencer,
    /// Output sample rate (e.g., 44100)
    sample_rate: u32,
    /// Samples rendered since the last rewind
    sample_counter: u64,
    /// Gain applied after the weighted track sum
    master_gain: f32,
    /// Steps per second of the composition, kept to rebuild the sequencer
    steps_per_second: u32,
    transport: Arc<Transport>,
    commands: Option<CommandReceiver>,
}

impl Engine {
    /// Create a stopped engine for the given composition.
    pub fn new(composition: &Composition, sample_rate: u32) -> Self {
        debug_assert_eq!(composition.validate(), Ok(()), "invalid composition");
        Self {
            tracks: composition.tracks.iter().map(Track::from_spec).collect(),
            sequencer: Sequencer::new(composition.samples_per_step(sample_rate), composition.step_count),
            sample_rate,
            sample_counter: 0,
            master_gain: 1.0,
            steps_per_second: composition.steps_per_second,
            transport: Arc::new(Transport::new()),
            commands: None,
        }
    }

    /// Attach the receiving end of a command queue.
    pub fn with_commands(mut self, commands: CommandReceiver) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn transport(&self) -> Arc<Transport> {
        Arc::clone(&self.transport)
    }

    pub fn play(&self) {
        self.transport.set_playing(true);
    }

    pub fn stop(&self) {
        self.transport.set_playing(false);
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Switch to a new output rate, keeping the playback position in time.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate || sample_rate == 0 {
            return;
        }
        let old_step = self.sequencer.samples_per_step();
        let new_step = (sample_rate / self.steps_per_second.max(1)).max(1);
        self.sample_counter = self.sample_counter * new_step as u64 / old_step;
        self.sequencer = Sequencer::new(new_step, self.sequencer.step_count());
        self.sample_rate = sample_rate;
        self.transport.publish_position(self.sample_counter);
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
    }

    pub fn sample_counter(&self) -> u64 {
        self.sample_counter
    }

    pub fn current_step(&self) -> usize {
        self.sequencer.step_at(self.sample_counter)
    }

    pub fn sequencer(&self) -> Sequencer {
        self.sequencer
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Back to sample 0 with every phase at zero.
    pub fn rewind(&mut self) {
        self.sample_counter = 0;
        for track in &mut self.tracks {
            track.reset_phases();
        }
        self.transport.publish_position(0);
    }

    /// Apply every queued command.
    pub fn apply_pending(&mut self) {
        let Some(commands) = self.commands.as_mut() else {
            return;
        };
        while let Some(command) = commands.try_recv() {
            match command {
                EngineCommand::SetStep {
                    track,
                    step,
                    settings,
                } => {
                    if let Some(t) = self.tracks.get_mut(track) {
                        t.set_step(step, settings);
                    }
                }
                EngineCommand::SetGain { track, gain } => {
                    if let Some(t) = self.tracks.get_mut(track) {
                        t.gain = gain;
                    }
                }
                EngineCommand::Rewind => {
                    self.sample_counter = 0;
                    for track in &mut self.tracks {
                        track.reset_phases();
                    }
                }
            }
        }
    }

    /// Fill an interleaved buffer of `channels` channels.
    ///
    /// Runs on the audio thread: no allocation, no locking, no I/O. Silence
    /// when stopped; otherwise every frame carries the same mono mix on all
    /// channels. The sample counter advances once per call.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_block(out, channels));
        #[cfg(not(feature = "alloc_check"))]
        self.render_block(out, channels);
    }

    fn render_block(&mut self, out: &mut [f32], channels: usize) {
        self.apply_pending();

        if channels == 0 || !self.transport.is_playing() {
            out.fill(0.0);
            return;
        }

        let mut chunks = out.chunks_exact_mut(channels);
        let mut frames = 0u64;
        for frame in &mut chunks {
            let sample = self.mix_sample(self.sample_counter + frames);
            frame.fill(sample);
            frames += 1;
        }
        chunks.into_remainder().fill(0.0);

        self.sample_counter += frames;
        self.transport.publish_position(self.sample_counter);
    }

    /// Weighted sum of every track at one sample position.
    fn mix_sample(&mut self, counter: u64) -> f32 {
        if self.sequencer.is_loop_boundary(counter) {
            for track in &mut self.tracks {
                track.reset_phases();
            }
        }
        let step = self.sequencer.step_at(counter);
        let rate = self.sample_rate as f32;
        let mut mix = 0.0;
        for track in &mut self.tracks {
            mix += track.gain * track.produce_sample(step, rate);
        }
        mix * self.master_gain
    }

    /// Render `frames` mono samples offline. Allocates; not for the audio thread.
    pub fn render_mono(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.render(&mut out, 1);
        out
    }
}
