//! Per-step frequency parameters.

/// Frequency parameters (Hz) held by one step of a track.
///
/// What each frequency drives depends on the track's role: `freq_a` is
/// always the audible carrier, `freq_b` the amplitude modulator and
/// `freq_c` (melodic tracks only) the carrier's frequency modulator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepSettings {
    pub freq_a: f32,
    pub freq_b: f32,
    pub freq_c: f32,
}

impl StepSettings {
    /// A step that produces no sound.
    pub const SILENT: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(freq_a: f32, freq_b: f32, freq_c: f32) -> Self {
        Self {
            freq_a,
            freq_b,
            freq_c,
        }
    }

    /// Copy of this step with a different carrier frequency.
    pub fn with_freq_a(self, freq_a: f32) -> Self {
        Self { freq_a, ..self }
    }

    pub fn is_silent(&self) -> bool {
        self.freq_a == 0.0
    }
}

/// Equal-tempered frequency of a MIDI note (A4 = note 69 = 440 Hz).
pub fn note_to_hz(note: u8) -> f32 {
    440.0 * libm::powf(2.0, (note as f32 - 69.0) / 12.0)
}
