//! Transport state shared between the main loop and the audio callback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Play flag and published playback position.
///
/// The audio callback is the only writer of `position`; the main loop reads
/// it for display. `playing` is flipped by the main loop and observed by the
/// callback before it mixes.
#[derive(Debug, Default)]
pub struct Transport {
    playing: AtomicBool,
    position: AtomicU64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    /// Last sample counter published by the engine.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    pub(crate) fn publish_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }
}
