//! Compositions: a fixed-length step table per track plus mix gains.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::step::{note_to_hz, StepSettings};

/// How a track combines its oscillators.
///
/// The role fixes which waveform shapes feed amplitude and frequency
/// modulation; step tables only supply the frequencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackRole {
    /// Sine carrier, sine amplitude modulator, sine frequency modulator.
    Melodic,
    /// Sine carrier gated by a square wave.
    Rhythmic,
    /// Triangle carrier with a sine amplitude modulator.
    Accent,
}

impl TrackRole {
    /// Number of phase accumulators a track of this role needs.
    pub fn phase_count(self) -> usize {
        match self {
            TrackRole::Melodic => 3,
            TrackRole::Rhythmic | TrackRole::Accent => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TrackRole::Melodic => "melodic",
            TrackRole::Rhythmic => "rhythmic",
            TrackRole::Accent => "accent",
        }
    }
}

/// One voice of a composition.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackSpec {
    pub name: String,
    pub role: TrackRole,
    /// Weight of this track in the mono mix.
    pub gain: f32,
    pub steps: Vec<StepSettings>,
}

/// Errors found while validating a composition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompositionError {
    #[error("composition has no steps")]
    NoSteps,
    #[error("steps per second must be non-zero")]
    ZeroStepRate,
    #[error("track {track} has {found} steps, expected {expected}")]
    StepCountMismatch {
        track: usize,
        expected: usize,
        found: usize,
    },
}

/// A complete piece: every track shares the same step count and step rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    pub title: String,
    /// Steps per second; one step lasts `sample_rate / steps_per_second` samples.
    pub steps_per_second: u32,
    /// Length of every track's step table.
    pub step_count: usize,
    pub tracks: Vec<TrackSpec>,
}

impl Composition {
    /// Create an empty composition with no tracks.
    pub fn new(title: &str, step_count: usize, steps_per_second: u32) -> Self {
        Self {
            title: String::from(title),
            steps_per_second,
            step_count,
            tracks: Vec::new(),
        }
    }

    /// Append a silent track of the given role.
    pub fn with_track(mut self, name: &str, role: TrackRole, gain: f32) -> Self {
        self.tracks.push(TrackSpec {
            name: String::from(name),
            role,
            gain,
            steps: vec![StepSettings::SILENT; self.step_count],
        });
        self
    }

    /// Samples each step is held for at the given sample rate.
    pub fn samples_per_step(&self, sample_rate: u32) -> u32 {
        (sample_rate / self.steps_per_second.max(1)).max(1)
    }

    /// Samples in one full pass through the step table.
    pub fn loop_samples(&self, sample_rate: u32) -> u64 {
        self.samples_per_step(sample_rate) as u64 * self.step_count as u64
    }

    pub fn validate(&self) -> Result<(), CompositionError> {
        if self.step_count == 0 {
            return Err(CompositionError::NoSteps);
        }
        if self.steps_per_second == 0 {
            return Err(CompositionError::ZeroStepRate);
        }
        for (track, spec) in self.tracks.iter().enumerate() {
            if spec.steps.len() != self.step_count {
                return Err(CompositionError::StepCountMismatch {
                    track,
                    expected: self.step_count,
                    found: spec.steps.len(),
                });
            }
        }
        Ok(())
    }

    pub fn step(&self, track: usize, step: usize) -> Option<StepSettings> {
        self.tracks.get(track)?.steps.get(step).copied()
    }

    /// Overwrite one step. Returns false if the slot does not exist.
    pub fn set_step(&mut self, track: usize, step: usize, settings: StepSettings) -> bool {
        match self.tracks.get_mut(track).and_then(|t| t.steps.get_mut(step)) {
            Some(slot) => {
                *slot = settings;
                true
            }
            None => false,
        }
    }

    /// Replace track gains with `weights`, in track order. Extra weights are ignored.
    pub fn apply_weights(&mut self, weights: &[f32]) {
        for (track, &weight) in self.tracks.iter_mut().zip(weights) {
            track.gain = weight;
        }
    }

    /// The built-in 64-step, three-track piece (four bars of sixteen steps).
    pub fn demo() -> Self {
        const BAR: usize = 16;
        const ROOTS: [u8; 4] = [57, 53, 60, 55];
        // Semitone offsets from the bar's root; None is a rest.
        const PHRASE: [Option<u8>; BAR] = [
            Some(12), None, Some(19), None, Some(24), None, Some(19), Some(15),
            Some(12), None, Some(17), None, Some(19), None, Some(22), None,
        ];
        const BASS: [bool; BAR] = [
            true, false, true, true, false, true, true, false,
            true, false, true, true, false, true, false, true,
        ];

        let mut comp = Composition::new("beeper", BAR * ROOTS.len(), 5)
            .with_track("lead", TrackRole::Melodic, 0.4)
            .with_track("bass", TrackRole::Rhythmic, 0.2)
            .with_track("beat", TrackRole::Accent, 0.9);

        for (bar, &root) in ROOTS.iter().enumerate() {
            for i in 0..BAR {
                let step = bar * BAR + i;
                if let Some(offset) = PHRASE[i] {
                    // The melodic carrier is scaled by (sine*0.5+0.5), which sits at
                    // 0.5 while freq_c is zero, so the table holds twice the pitch.
                    let hz = note_to_hz(root + offset - 12) * 2.0;
                    comp.set_step(0, step, StepSettings::new(hz, 3.0, 0.0));
                }
                if BASS[i] {
                    let hz = note_to_hz(root - 12);
                    comp.set_step(1, step, StepSettings::new(hz, 5.0, 0.0));
                }
                if i % 4 == 0 {
                    comp.set_step(2, step, StepSettings::new(60.0, 2.5, 0.0));
                }
            }
        }
        comp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_is_valid() {
        let comp = Composition::demo();
        assert_eq!(comp.step_count, 64);
        assert_eq!(comp.tracks.len(), 3);
        assert_eq!(comp.validate(), Ok(()));
    }

    #[test]
    fn demo_gains_match_default_mix() {
        let gains: Vec<f32> = Composition::demo().tracks.iter().map(|t| t.gain).collect();
        assert_eq!(gains, vec![0.4, 0.2, 0.9]);
    }

    #[test]
    fn samples_per_step_at_44100() {
        let comp = Composition::new("t", 4, 5);
        assert_eq!(comp.samples_per_step(44100), 8820);
        assert_eq!(comp.loop_samples(44100), 4 * 8820);
    }

    #[test]
    fn validate_rejects_mismatched_tracks() {
        let mut comp = Composition::new("t", 4, 5).with_track("a", TrackRole::Accent, 1.0);
        comp.tracks[0].steps.pop();
        assert_eq!(
            comp.validate(),
            Err(CompositionError::StepCountMismatch {
                track: 0,
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn validate_rejects_empty_and_zero_rate() {
        assert_eq!(Composition::new("t", 0, 5).validate(), Err(CompositionError::NoSteps));
        assert_eq!(
            Composition::new("t", 4, 0).validate(),
            Err(CompositionError::ZeroStepRate)
        );
    }

    #[test]
    fn set_step_out_of_range_is_rejected() {
        let mut comp = Composition::new("t", 4, 5).with_track("a", TrackRole::Accent, 1.0);
        assert!(comp.set_step(0, 3, StepSettings::new(1.0, 0.0, 0.0)));
        assert!(!comp.set_step(0, 4, StepSettings::SILENT));
        assert!(!comp.set_step(1, 0, StepSettings::SILENT));
    }

    #[test]
    fn apply_weights_ignores_extra_entries() {
        let mut comp = Composition::new("t", 1, 5)
            .with_track("a", TrackRole::Accent, 1.0)
            .with_track("b", TrackRole::Rhythmic, 1.0);
        comp.apply_weights(&[0.5, 0.25, 9.0]);
        assert_eq!(comp.tracks[0].gain, 0.5);
        assert_eq!(comp.tracks[1].gain, 0.25);
    }
}
