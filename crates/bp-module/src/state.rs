//! The module's single root object and its trip across a reload.

use bp_ir::{HandoffError, StateHandoff};
use bp_master::{BeeperConfig, Composition, Controller, FrameClock};

/// Bump whenever [`ModuleState`] or anything it owns changes shape.
pub const STATE_VERSION: u32 = 1;

/// Everything the module keeps between frames.
///
/// Allocated by `init`, freed by `cleanup`, and handed across reloads as a
/// raw pointer inside a [`StateHandoff`]. Only the audio device is torn down
/// and rebuilt around a reload; the engine, its phases and the sample
/// counter move over untouched.
pub struct ModuleState {
    pub controller: Controller,
    pub ui: UiState,
    /// Present while the export preview drives the visual clock.
    pub preview: Option<Preview>,
}

/// Pointer interaction scratch state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UiState {
    /// Track the current drag started on; edits stay on that track.
    pub drag_track: Option<usize>,
    /// Last step written by the drag, with the frequency written.
    pub last_edit: Option<(usize, f32)>,
}

/// Export preview: one video frame per host tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preview {
    pub clock: FrameClock,
    pub frame: u64,
}

impl Preview {
    pub fn new(clock: FrameClock) -> Self {
        Self { clock, frame: 0 }
    }

    /// Position of the current frame, then step to the next.
    pub fn advance(&mut self) -> u64 {
        let position = self.clock.sample_at(self.frame);
        self.frame += 1;
        position
    }
}

impl ModuleState {
    pub fn new(config: BeeperConfig) -> bp_master::Result<Self> {
        Ok(Self {
            controller: Controller::new(Composition::demo(), config)?,
            ui: UiState::default(),
            preview: None,
        })
    }

    /// Open audio and start playing.
    pub fn start(&mut self) -> bp_master::Result<()> {
        self.controller.start_audio()?;
        self.controller.play();
        Ok(())
    }

    /// Release what cannot outlive the code image.
    pub fn suspend(&mut self) {
        self.controller.stop_audio();
        self.ui = UiState::default();
    }

    /// Rebuild the audio device after a reload. Failure leaves the module silent.
    pub fn resume(&mut self) {
        if let Err(e) = self.controller.start_audio() {
            tracing::warn!("audio unavailable after reload, continuing silent: {e}");
        }
    }

    /// Give up ownership for the trip across a reload.
    pub fn into_handoff(self: Box<Self>) -> StateHandoff {
        StateHandoff::of(STATE_VERSION, Box::into_raw(self))
    }

    /// Take ownership of state produced by [`ModuleState::into_handoff`].
    ///
    /// # Safety
    /// A handoff that validates must carry a pointer obtained from
    /// `into_handoff` that nothing else owns.
    pub unsafe fn adopt(handoff: StateHandoff) -> Result<Box<Self>, HandoffError> {
        let state = handoff.validate::<Self>(STATE_VERSION)?;
        Ok(Box::from_raw(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_master::BackendKind;

    fn null_state() -> Box<ModuleState> {
        let mut config = BeeperConfig::default();
        config.audio.backend = BackendKind::Null;
        Box::new(ModuleState::new(config).unwrap())
    }

    #[test]
    fn handoff_round_trip_keeps_engine_state() {
        let mut state = null_state();
        state.start().unwrap();
        state
            .controller
            .device_mut()
            .and_then(|d| d.as_null_mut())
            .unwrap()
            .pull(12_345);

        let (counter, phases) = {
            let engine = state.controller.engine().lock().unwrap();
            let phases: Vec<Vec<f32>> = engine
                .tracks()
                .iter()
                .map(|t| t.phases().as_slice().to_vec())
                .collect();
            (engine.sample_counter(), phases)
        };

        state.suspend();
        assert!(!state.controller.has_audio());
        let handoff = state.into_handoff();
        let mut state = unsafe { ModuleState::adopt(handoff) }.unwrap();
        state.resume();

        assert!(state.controller.has_audio());
        assert!(state.controller.is_playing());
        let engine = state.controller.engine().lock().unwrap();
        assert_eq!(engine.sample_counter(), counter);
        for (track, before) in engine.tracks().iter().zip(&phases) {
            assert_eq!(track.phases().as_slice(), before.as_slice());
        }
    }

    #[test]
    fn resume_without_audio_keeps_running_silent() {
        let mut state = null_state();
        state.start().unwrap();
        state.suspend();

        // A poisoned engine lock makes reopening the device fail.
        let engine = state.controller.engine().clone();
        let _ = std::thread::spawn(move || {
            let _guard = engine.lock().unwrap();
            panic!("engine lock poisoned on purpose");
        })
        .join();

        state.resume();
        assert!(!state.controller.has_audio());
        assert!(state.controller.is_playing());

        let mut ctx = bp_ir::HostContext::new(bp_ir::RendererTable::discard());
        ctx.input = bp_ir::FrameInput {
            width: 900.0,
            height: 800.0,
            keys_pressed: bp_ir::keys::SPACE,
            ..bp_ir::FrameInput::default()
        };
        crate::ui::update(&mut state, &mut ctx);
        assert!(!state.controller.is_playing());
    }

    #[test]
    fn adopt_rejects_other_versions() {
        let state = null_state();
        let mut handoff = state.into_handoff();
        handoff.version = STATE_VERSION + 1;
        let err = unsafe { ModuleState::adopt(handoff) }.err().unwrap();
        assert_eq!(
            err,
            HandoffError::VersionMismatch {
                expected: STATE_VERSION,
                found: STATE_VERSION + 1
            }
        );
        // Reclaim so the test does not leak.
        handoff.version = STATE_VERSION;
        drop(unsafe { ModuleState::adopt(handoff) }.unwrap());
    }

    #[test]
    fn preview_advances_one_frame_per_tick() {
        let mut preview = Preview::new(FrameClock::offline(44100, 60));
        assert_eq!(preview.advance(), 0);
        assert_eq!(preview.advance(), 735);
        assert_eq!(preview.frame, 2);
    }
}
