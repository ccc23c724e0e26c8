//! 16-bit PCM frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: i16) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    /// Convert a float sample in `[-1, 1]` to a mono frame, clipping outside it.
    pub fn from_sample(sample: f32) -> Self {
        Self::mono(to_pcm16(sample))
    }
}

/// Scale a float sample to 16-bit PCM with clipping.
pub fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
