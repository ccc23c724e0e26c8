//! Per-frame interaction and drawing.

use bp_ir::{keys, DrawCommand, FrameInput, HostContext, Rect};
use bp_master::raster::Canvas;
use bp_master::{build_scene, FrameClock, GridLayout, SceneView};

use crate::state::{ModuleState, Preview};

/// Handle this frame's input, then draw the step grid.
pub fn update(state: &mut ModuleState, ctx: &mut HostContext) {
    let input = ctx.input;

    if input.pressed(keys::Q) {
        ctx.quit_requested = true;
    }
    if input.pressed(keys::SPACE) {
        state.controller.toggle();
    }
    if input.pressed(keys::R) {
        state.controller.rewind();
        if let Some(preview) = state.preview.as_mut() {
            preview.frame = 0;
        }
    }
    if input.pressed(keys::P) {
        toggle_preview(state);
    }
    for (track, key) in keys::TRACK_MUTE.into_iter().enumerate() {
        if input.pressed(key) {
            state.controller.toggle_mute(track);
        }
    }
    if input.pressed(keys::E) {
        state.preview = None;
        match state.controller.export() {
            Ok(report) => tracing::info!(?report, "export complete"),
            Err(e) => tracing::error!("export failed: {e}"),
        }
    }

    drag_edit(state, input.pointer_down, input.pointer_x, input.pointer_y, input.width, input.height);

    ctx.renderer.submit(&frame_commands(state, &input));
}

/// Thumbnail size relative to the window.
const THUMB_SCALE: f32 = 4.0;
const THUMB_MARGIN: f32 = 8.0;

/// The step grid at the current position, plus the preview thumbnail while
/// previewing.
fn frame_commands(state: &mut ModuleState, input: &FrameInput) -> Vec<DrawCommand> {
    let position = match state.preview.as_mut() {
        Some(preview) => preview.advance(),
        None => state.controller.position(),
    };
    let view = SceneView {
        composition: state.controller.composition(),
        current_step: state.controller.step_at(position),
        playing: state.controller.is_playing(),
        preview: state.preview.is_some(),
        width: input.width,
        height: input.height,
    };
    let mut commands = build_scene(&view);
    if view.preview {
        commands.push(preview_thumbnail(&view));
    }
    commands
}

/// The frame the exporter would encode, drawn small in the top-right corner.
fn preview_thumbnail(view: &SceneView<'_>) -> DrawCommand {
    let width = (view.width / THUMB_SCALE).floor().max(1.0);
    let height = (view.height / THUMB_SCALE).floor().max(1.0);
    let mut canvas = Canvas::new(width as u32, height as u32);
    canvas.draw(&build_scene(&SceneView { width, height, ..*view }));
    canvas.into_texture(Rect::new(view.width - width - THUMB_MARGIN, THUMB_MARGIN, width, height))
}

fn toggle_preview(state: &mut ModuleState) {
    if state.preview.take().is_some() {
        tracing::info!("preview stopped");
        return;
    }
    let fps = state.controller.config().export.fps;
    let latency_ms = state.controller.config().export.preview_latency_ms;
    let clock = FrameClock::preview(state.controller.sample_rate(), fps, latency_ms);
    state.preview = Some(Preview::new(clock));
    state.controller.rewind();
    state.controller.play();
    tracing::info!(fps, latency_ms, "preview started");
}

/// Dragging on a bar rewrites that step's `freq_a`.
fn drag_edit(state: &mut ModuleState, down: bool, x: f32, y: f32, width: f32, height: f32) {
    if !down {
        state.ui.drag_track = None;
        state.ui.last_edit = None;
        return;
    }
    let layout = GridLayout::for_composition(state.controller.composition(), width, height);
    let Some(hit) = layout.hit_test(x, y) else {
        return;
    };
    let track = *state.ui.drag_track.get_or_insert(hit.track);
    if track != hit.track || state.ui.last_edit == Some((hit.step, hit.freq)) {
        return;
    }
    let Some(settings) = state.controller.composition().step(track, hit.step) else {
        return;
    };
    if state.controller.set_step(track, hit.step, settings.with_freq_a(hit.freq)) {
        state.ui.last_edit = Some((hit.step, hit.freq));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_ir::RendererTable;
    use bp_master::{BackendKind, BeeperConfig};

    fn state() -> ModuleState {
        let mut config = BeeperConfig::default();
        config.audio.backend = BackendKind::Null;
        let mut state = ModuleState::new(config).unwrap();
        state.start().unwrap();
        state
    }

    fn frame(keys_pressed: u32) -> FrameInput {
        FrameInput {
            width: 900.0,
            height: 800.0,
            delta: 1.0 / 60.0,
            keys_pressed,
            ..FrameInput::default()
        }
    }

    #[test]
    fn space_toggles_playback() {
        let mut state = state();
        let mut ctx = HostContext::new(RendererTable::discard());
        assert!(state.controller.is_playing());
        ctx.input = frame(keys::SPACE);
        update(&mut state, &mut ctx);
        assert!(!state.controller.is_playing());
        update(&mut state, &mut ctx);
        assert!(state.controller.is_playing());
    }

    #[test]
    fn q_requests_quit() {
        let mut state = state();
        let mut ctx = HostContext::new(RendererTable::discard());
        ctx.input = frame(keys::Q);
        update(&mut state, &mut ctx);
        assert!(ctx.quit_requested);
    }

    #[test]
    fn preview_draws_export_frame_thumbnail() {
        let mut state = state();
        let input = frame(0);
        let live = frame_commands(&mut state, &input);
        assert!(!live.iter().any(|c| matches!(c, DrawCommand::Texture { .. })));

        toggle_preview(&mut state);
        let commands = frame_commands(&mut state, &input);
        let Some(DrawCommand::Texture { rect, width, height, rgba }) = commands.last() else {
            panic!("no thumbnail in preview frame");
        };
        assert_eq!((*width, *height), (225, 200));
        assert_eq!(rgba.len(), 225 * 200 * 4);
        assert_eq!(*rect, Rect::new(900.0 - 225.0 - THUMB_MARGIN, THUMB_MARGIN, 225.0, 200.0));
        // The thumbnail is opaque: the scene clears its background.
        assert!(rgba.chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn number_keys_mute_tracks() {
        let mut state = state();
        let mut ctx = HostContext::new(RendererTable::discard());
        ctx.input = frame(keys::TWO);
        update(&mut state, &mut ctx);
        let gains: Vec<f32> = state.controller.composition().tracks.iter().map(|t| t.gain).collect();
        assert_eq!(gains, vec![0.4, 0.0, 0.9]);
        update(&mut state, &mut ctx);
        assert_eq!(state.controller.composition().tracks[1].gain, 0.2);
    }

    #[test]
    fn preview_toggles_and_counts_frames() {
        let mut state = state();
        let mut ctx = HostContext::new(RendererTable::discard());
        ctx.input = frame(keys::P);
        update(&mut state, &mut ctx);
        assert_eq!(state.preview.map(|p| p.frame), Some(1));
        ctx.input = frame(0);
        update(&mut state, &mut ctx);
        assert_eq!(state.preview.map(|p| p.frame), Some(2));
        ctx.input = frame(keys::P);
        update(&mut state, &mut ctx);
        assert!(state.preview.is_none());
    }

    #[test]
    fn drag_sets_frequency_of_bar_under_pointer() {
        let mut state = state();
        let mut ctx = HostContext::new(RendererTable::discard());
        let layout = GridLayout::for_composition(state.controller.composition(), 900.0, 800.0);
        let slot = layout.slot(1, 5);
        ctx.input = FrameInput {
            pointer_down: true,
            pointer_x: slot.x + slot.w * 0.5,
            pointer_y: slot.y + slot.h * 0.5,
            ..frame(0)
        };
        update(&mut state, &mut ctx);
        let freq = state.controller.composition().step(1, 5).unwrap().freq_a;
        assert!((freq - bp_master::scene::BAR_FULL_SCALE_HZ * 0.5).abs() < 1.0);
        assert_eq!(state.ui.drag_track, Some(1));

        ctx.input.pointer_down = false;
        update(&mut state, &mut ctx);
        assert_eq!(state.ui.drag_track, None);
    }

    #[test]
    fn drag_stays_on_starting_track() {
        let mut state = state();
        let mut ctx = HostContext::new(RendererTable::discard());
        let layout = GridLayout::for_composition(state.controller.composition(), 900.0, 800.0);
        let start = layout.slot(0, 3);
        ctx.input = FrameInput {
            pointer_down: true,
            pointer_x: start.x + 1.0,
            pointer_y: start.y + 1.0,
            ..frame(0)
        };
        update(&mut state, &mut ctx);
        let before = state.controller.composition().step(2, 3).unwrap();
        let other = layout.slot(2, 3);
        ctx.input.pointer_y = other.y + other.h * 0.5;
        update(&mut state, &mut ctx);
        assert_eq!(state.controller.composition().step(2, 3).unwrap(), before);
    }
}
