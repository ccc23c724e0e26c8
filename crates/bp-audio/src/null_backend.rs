//! Deviceless backend for headless runs and tests.

use bp_engine::SharedEngine;

use crate::traits::{AudioError, AudioOutput};

/// Output with no device behind it.
///
/// Nothing is rendered on its own; [`NullOutput::pull`] stands in for the
/// device callback so callers can drive the engine by hand.
pub struct NullOutput {
    engine: SharedEngine,
    sample_rate: u32,
    channels: usize,
    running: bool,
}

impl NullOutput {
    pub fn new(engine: SharedEngine, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        engine
            .lock()
            .map_err(|_| AudioError::DeviceInit("engine lock poisoned".to_string()))?
            .set_sample_rate(sample_rate);
        Ok(Self {
            engine,
            sample_rate,
            channels: channels.max(1) as usize,
            running: false,
        })
    }

    /// Render `frames` interleaved frames the way a device callback would.
    /// Returns silence while stopped.
    pub fn pull(&mut self, frames: usize) -> Vec<f32> {
        let mut buf = vec![0.0; frames * self.channels];
        if self.running {
            if let Ok(mut engine) = self.engine.try_lock() {
                engine.render(&mut buf, self.channels);
            }
        }
        buf
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_engine::Engine;
    use bp_ir::Composition;

    #[test]
    fn pull_is_silent_until_started() {
        let engine = Engine::new(&Composition::demo(), 44100);
        engine.play();
        let mut out = NullOutput::new(engine.into_shared(), 44100, 2).unwrap();
        assert!(out.pull(256).iter().all(|&s| s == 0.0));
        out.start().unwrap();
        assert!(out.pull(4410).iter().any(|&s| s != 0.0));
    }

    #[test]
    fn new_sets_engine_rate() {
        let shared = Engine::new(&Composition::demo(), 44100).into_shared();
        let out = NullOutput::new(shared.clone(), 48000, 2).unwrap();
        assert_eq!(out.sample_rate(), 48000);
        assert_eq!(shared.lock().unwrap().sample_rate(), 48000);
    }
}
