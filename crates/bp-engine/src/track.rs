//! Per-track synthesis state.

use core::f32::consts::TAU;

use bp_ir::{StepSettings, TrackRole, TrackSpec};

use crate::oscillator::{sine, square, triangle, wrap_phase};

/// Up to three independent phase accumulators, each kept in `[0, 2π)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseSet {
    phases: heapless::Vec<f32, 3>,
}

impl PhaseSet {
    /// `count` accumulators at phase zero. `count` is clamped to 1..=3.
    pub fn new(count: usize) -> Self {
        let mut phases = heapless::Vec::new();
        for _ in 0..count.clamp(1, 3) {
            let _ = phases.push(0.0);
        }
        Self { phases }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get(&self, index: usize) -> f32 {
        self.phases[index]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.phases
    }

    /// Advance one accumulator by `2π·frequency/sample_rate` and reduce mod 2π.
    pub fn advance(&mut self, index: usize, frequency: f32, sample_rate: f32) {
        let phase = &mut self.phases[index];
        *phase = wrap_phase(*phase + TAU * frequency / sample_rate);
    }

    pub fn reset(&mut self) {
        for phase in self.phases.iter_mut() {
            *phase = 0.0;
        }
    }
}

/// One synthesis voice: a step table and the phases driving its oscillators.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub role: TrackRole,
    pub gain: f32,
    steps: Vec<StepSettings>,
    phases: PhaseSet,
}

impl Track {
    pub fn new(role: TrackRole, gain: f32, steps: Vec<StepSettings>) -> Self {
        Self {
            role,
            gain,
            steps,
            phases: PhaseSet::new(role.phase_count()),
        }
    }

    pub fn from_spec(spec: &TrackSpec) -> Self {
        Self::new(spec.role, spec.gain, spec.steps.clone())
    }

    pub fn steps(&self) -> &[StepSettings] {
        &self.steps
    }

    pub fn phases(&self) -> &PhaseSet {
        &self.phases
    }

    pub fn set_step(&mut self, step: usize, settings: StepSettings) -> bool {
        match self.steps.get_mut(step) {
            Some(slot) => {
                *slot = settings;
                true
            }
            None => false,
        }
    }

    pub fn reset_phases(&mut self) {
        self.phases.reset();
    }

    /// Produce one sample for `step`, then advance every phase.
    ///
    /// The output is computed from the phases as they were before the
    /// advance, so a freshly reset track starts at exactly zero.
    pub fn produce_sample(&mut self, step: usize, sample_rate: f32) -> f32 {
        debug_assert!(step < self.steps.len(), "step {step} out of table bounds");
        let s = self.steps[step];
        let p = &mut self.phases;
        match self.role {
            TrackRole::Melodic => {
                let out = sine(p.get(0)) * (sine(p.get(1)) * 0.5 + 0.5);
                let carrier = (sine(p.get(2)) * 0.5 + 0.5) * s.freq_a;
                p.advance(0, carrier, sample_rate);
                p.advance(1, s.freq_b, sample_rate);
                p.advance(2, s.freq_c, sample_rate);
                out
            }
            TrackRole::Rhythmic => {
                let out = sine(p.get(0)) * (square(p.get(1)) * 0.5 + 0.5);
                p.advance(0, s.freq_a, sample_rate);
                p.advance(1, s.freq_b, sample_rate);
                out
            }
            TrackRole::Accent => {
                let out = triangle(p.get(0)) * (sine(p.get(1)) * 0.5 + 0.5);
                p.advance(0, s.freq_a, sample_rate);
                p.advance(1, s.freq_b, sample_rate);
                out
            }
        }
    }
}
