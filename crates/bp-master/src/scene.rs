//! Step-grid layout shared by the live view and video export.
//!
//! Every track gets a horizontal lane; every step of a lane is a vertical
//! bar whose height follows the step's `freq_a`. The same layout answers
//! pointer hit tests so dragging on a bar can rewrite its frequency.

use bp_ir::{Color, Composition, DrawCommand, Rect, TrackRole};

/// Frequency shown as a full-height bar.
pub const BAR_FULL_SCALE_HZ: f32 = 1200.0;

const HEADER_HEIGHT: f32 = 56.0;
const MARGIN: f32 = 16.0;
const BAR_GAP: f32 = 1.0;
const REST_HEIGHT: f32 = 2.0;

const BACKGROUND: Color = Color::rgb(18, 18, 24);
const LANE: Color = Color::rgb(32, 32, 44);
const CURSOR: Color = Color::rgba(255, 255, 255, 40);
const TEXT: Color = Color::rgb(220, 220, 230);
const REST: Color = Color::rgb(70, 70, 86);

fn role_color(role: TrackRole, lit: bool) -> Color {
    match (role, lit) {
        (TrackRole::Melodic, false) => Color::rgb(70, 130, 200),
        (TrackRole::Melodic, true) => Color::rgb(140, 200, 255),
        (TrackRole::Rhythmic, false) => Color::rgb(200, 120, 60),
        (TrackRole::Rhythmic, true) => Color::rgb(255, 190, 120),
        (TrackRole::Accent, false) => Color::rgb(90, 170, 90),
        (TrackRole::Accent, true) => Color::rgb(160, 240, 160),
    }
}

/// What one frame of the view shows.
#[derive(Clone, Copy, Debug)]
pub struct SceneView<'a> {
    pub composition: &'a Composition,
    pub current_step: usize,
    pub playing: bool,
    /// Shown in the header while previewing or exporting.
    pub preview: bool,
    pub width: f32,
    pub height: f32,
}

/// Geometry of the step grid for a given target size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    width: f32,
    height: f32,
    tracks: usize,
    steps: usize,
}

/// A pointer position resolved to a step and the frequency it points at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepHit {
    pub track: usize,
    pub step: usize,
    pub freq: f32,
}

impl GridLayout {
    pub fn new(width: f32, height: f32, tracks: usize, steps: usize) -> Self {
        Self {
            width,
            height,
            tracks,
            steps,
        }
    }

    pub fn for_composition(composition: &Composition, width: f32, height: f32) -> Self {
        Self::new(width, height, composition.tracks.len(), composition.step_count)
    }

    /// Background strip of one track.
    pub fn lane(&self, track: usize) -> Rect {
        let tracks = self.tracks.max(1) as f32;
        let available = (self.height - HEADER_HEIGHT - MARGIN * (tracks + 1.0)).max(0.0);
        let lane_h = available / tracks;
        let y = HEADER_HEIGHT + MARGIN + track as f32 * (lane_h + MARGIN);
        Rect::new(MARGIN, y, (self.width - 2.0 * MARGIN).max(0.0), lane_h)
    }

    /// Full-height slot a step's bar is drawn in.
    pub fn slot(&self, track: usize, step: usize) -> Rect {
        let lane = self.lane(track);
        let slot_w = lane.w / self.steps.max(1) as f32;
        Rect::new(lane.x + step as f32 * slot_w, lane.y, slot_w, lane.h)
    }

    /// Bar for a step of the given frequency, growing up from the lane floor.
    pub fn bar(&self, track: usize, step: usize, freq: f32) -> Rect {
        let slot = self.slot(track, step);
        let level = (freq / BAR_FULL_SCALE_HZ).clamp(0.0, 1.0);
        let h = slot.h * level;
        Rect::new(slot.x, slot.y + slot.h - h, (slot.w - BAR_GAP).max(1.0), h)
    }

    /// Thin marker on the lane floor for a step that plays nothing.
    pub fn rest(&self, track: usize, step: usize) -> Rect {
        let slot = self.slot(track, step);
        let h = REST_HEIGHT.min(slot.h);
        Rect::new(slot.x, slot.y + slot.h - h, (slot.w - BAR_GAP).max(1.0), h)
    }

    /// Resolve a pointer position to a step slot.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<StepHit> {
        (0..self.tracks).find_map(|track| {
            let lane = self.lane(track);
            if !lane.contains(x, y) || lane.h <= 0.0 {
                return None;
            }
            let step = (((x - lane.x) / lane.w) * self.steps as f32) as usize;
            let level = (lane.y + lane.h - y) / lane.h;
            Some(StepHit {
                track,
                step: step.min(self.steps.saturating_sub(1)),
                freq: level.clamp(0.0, 1.0) * BAR_FULL_SCALE_HZ,
            })
        })
    }
}

/// Lay out one frame as draw commands.
pub fn build_scene(view: &SceneView<'_>) -> Vec<DrawCommand> {
    let comp = view.composition;
    let layout = GridLayout::for_composition(comp, view.width, view.height);
    let mut commands = Vec::with_capacity(4 + comp.tracks.len() * (comp.step_count + 2));

    commands.push(DrawCommand::Clear(BACKGROUND));
    commands.push(DrawCommand::Text {
        text: comp.title.clone(),
        x: MARGIN,
        y: MARGIN,
        size: 24.0,
        color: TEXT,
    });
    let status = match (view.preview, view.playing) {
        (true, _) => "preview",
        (false, true) => "playing",
        (false, false) => "paused",
    };
    commands.push(DrawCommand::Text {
        text: format!("{status}  step {:>3}/{}", view.current_step + 1, comp.step_count),
        x: view.width * 0.5,
        y: MARGIN,
        size: 18.0,
        color: TEXT,
    });

    for (index, track) in comp.tracks.iter().enumerate() {
        commands.push(DrawCommand::Rect {
            rect: layout.lane(index),
            color: LANE,
        });
        for (step, settings) in track.steps.iter().enumerate() {
            let lit = step == view.current_step;
            let (rect, color) = if settings.is_silent() {
                (layout.rest(index, step), REST)
            } else {
                (layout.bar(index, step, settings.freq_a), role_color(track.role, lit))
            };
            commands.push(DrawCommand::Rect { rect, color });
        }
        let lane = layout.lane(index);
        let muted = if track.gain == 0.0 { "  muted" } else { "" };
        commands.push(DrawCommand::Text {
            text: format!("{} ({}){muted}", track.name, track.role.name()),
            x: lane.x + 4.0,
            y: lane.y + 4.0,
            size: 14.0,
            color: TEXT,
        });
    }

    if comp.step_count > 0 && !comp.tracks.is_empty() {
        let top = layout.slot(0, view.current_step);
        let bottom = layout.slot(comp.tracks.len() - 1, view.current_step);
        commands.push(DrawCommand::Rect {
            rect: Rect::new(top.x, top.y, top.w, bottom.y + bottom.h - top.y),
            color: CURSOR,
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_ir::StepSettings;

    fn view(comp: &Composition, current_step: usize) -> SceneView<'_> {
        SceneView {
            composition: comp,
            current_step,
            playing: true,
            preview: false,
            width: 900.0,
            height: 800.0,
        }
    }

    #[test]
    fn scene_starts_with_clear_and_draws_every_step() {
        let comp = Composition::demo();
        let commands = build_scene(&view(&comp, 0));
        assert!(matches!(commands[0], DrawCommand::Clear(_)));
        let rects = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .count();
        // One lane and one bar per step for each track, plus the cursor.
        assert_eq!(rects, 3 * (64 + 1) + 1);
    }

    #[test]
    fn current_step_is_highlighted() {
        let mut comp = Composition::new("t", 4, 5).with_track("a", TrackRole::Rhythmic, 1.0);
        for step in 0..4 {
            comp.set_step(0, step, StepSettings::new(600.0, 1.0, 0.0));
        }
        let commands = build_scene(&view(&comp, 2));
        let lit = role_color(TrackRole::Rhythmic, true);
        let lit_bars: Vec<Rect> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { rect, color } if *color == lit => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(lit_bars.len(), 1);
        let layout = GridLayout::for_composition(&comp, 900.0, 800.0);
        assert_eq!(lit_bars[0], layout.bar(0, 2, 600.0));
    }

    #[test]
    fn silent_steps_draw_a_rest_marker() {
        let mut comp = Composition::new("t", 2, 5).with_track("a", TrackRole::Melodic, 1.0);
        comp.set_step(0, 1, StepSettings::new(600.0, 1.0, 0.0));
        let commands = build_scene(&view(&comp, 0));
        let layout = GridLayout::for_composition(&comp, 900.0, 800.0);
        let rest = layout.rest(0, 0);
        assert!(commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Rect { rect, color } if *rect == rest && *color == REST)));
        assert_eq!(rest.h, REST_HEIGHT);
        // A silent current step has no lit bar.
        let lit = role_color(TrackRole::Melodic, true);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Rect { color, .. } if *color == lit)));
    }

    #[test]
    fn muted_track_is_labelled() {
        let comp = Composition::new("t", 2, 5)
            .with_track("lead", TrackRole::Melodic, 0.0)
            .with_track("beat", TrackRole::Rhythmic, 0.5);
        let labels: Vec<String> = build_scene(&view(&comp, 0))
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } if text.contains('(') => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["lead (melodic)  muted", "beat (rhythmic)"]);
    }

    #[test]
    fn lanes_do_not_overlap() {
        let layout = GridLayout::new(900.0, 800.0, 3, 64);
        for track in 0..2 {
            let a = layout.lane(track);
            let b = layout.lane(track + 1);
            assert!(a.y + a.h < b.y);
        }
        let last = layout.lane(2);
        assert!(last.y + last.h <= 800.0);
    }

    #[test]
    fn hit_test_maps_pointer_to_step_and_frequency() {
        let layout = GridLayout::new(900.0, 800.0, 3, 64);
        let slot = layout.slot(1, 10);
        let hit = layout
            .hit_test(slot.x + slot.w * 0.5, slot.y + slot.h * 0.25)
            .unwrap();
        assert_eq!(hit.track, 1);
        assert_eq!(hit.step, 10);
        assert!((hit.freq - 0.75 * BAR_FULL_SCALE_HZ).abs() < 1.0);
    }

    #[test]
    fn hit_test_misses_header_and_margins() {
        let layout = GridLayout::new(900.0, 800.0, 3, 64);
        assert_eq!(layout.hit_test(450.0, 10.0), None);
        assert_eq!(layout.hit_test(2.0, 400.0), None);
    }

    #[test]
    fn bar_height_tracks_frequency() {
        let layout = GridLayout::new(900.0, 800.0, 1, 8);
        let slot = layout.slot(0, 3);
        assert_eq!(layout.bar(0, 3, 0.0).h, 0.0);
        assert_eq!(layout.bar(0, 3, BAR_FULL_SCALE_HZ * 4.0).h, slot.h);
        let half = layout.bar(0, 3, BAR_FULL_SCALE_HZ * 0.5);
        assert!((half.h - slot.h * 0.5).abs() < 1e-3);
        assert!((half.y + half.h - (slot.y + slot.h)).abs() < 1e-3);
    }
}
