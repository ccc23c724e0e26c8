//! Offline export: the whole sequence rendered to PCM, then replayed frame
//! by frame at a fixed video rate.

mod encoder;

use std::path::Path;

use bp_engine::{current_step, Engine};
use bp_ir::Composition;

use crate::config::BeeperConfig;
use crate::error::Result;
use crate::raster::Canvas;
use crate::scene::{build_scene, SceneView};

pub use encoder::{AudioSink, FfmpegAudio, FfmpegVideo, FrameSink, FrameStatus, WavFile};

/// Maps video frame numbers to sample positions.
///
/// Positions are exact multiples of `sample_rate / fps` rounded down per
/// frame, so the picture never drifts from the audio when the rate does not
/// divide evenly. Offline export runs with no offset. Live preview shifts
/// the clock back by the device latency so the picture matches what is
/// being heard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameClock {
    sample_rate: u64,
    fps: u64,
    offset: i64,
}

impl FrameClock {
    pub fn offline(sample_rate: u32, fps: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1) as u64,
            fps: fps.max(1) as u64,
            offset: 0,
        }
    }

    pub fn preview(sample_rate: u32, fps: u32, latency_ms: u32) -> Self {
        let latency = sample_rate as i64 * latency_ms as i64 / 1000;
        Self {
            offset: -latency,
            ..Self::offline(sample_rate, fps)
        }
    }

    /// Sample position shown by video frame `frame`.
    pub fn sample_at(&self, frame: u64) -> u64 {
        let exact = (frame as u128 * self.sample_rate as u128 / self.fps as u128) as i64;
        (exact + self.offset).max(0) as u64
    }

    /// Frames needed to cover `samples` samples.
    pub fn frames_for(&self, samples: u64) -> u64 {
        (samples as u128 * self.fps as u128).div_ceil(self.sample_rate as u128) as u64
    }
}

/// Parameters of one export run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportSettings {
    pub sample_rate: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub loops: u32,
    pub master_gain: f32,
}

impl ExportSettings {
    pub fn from_config(config: &BeeperConfig) -> Self {
        Self {
            sample_rate: config.audio.sample_rate,
            fps: config.export.fps,
            width: config.export.width,
            height: config.export.height,
            loops: config.export.loops.max(1),
            master_gain: config.mix.master_gain,
        }
    }
}

/// Outcome of an export run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Mono samples written to the audio sink.
    pub samples: u64,
    /// Video frames the encoder accepted.
    pub frames: u64,
    /// Frames the full sequence would need.
    pub frames_total: u64,
    /// The encoder refused a frame before the end.
    pub finished_early: bool,
}

/// Render `loops` passes of the composition from sample 0 through the live
/// mixing path.
pub fn render_sequence(
    composition: &Composition,
    sample_rate: u32,
    loops: u32,
    master_gain: f32,
) -> Result<Vec<f32>> {
    composition.validate()?;
    let mut engine = Engine::new(composition, sample_rate);
    engine.set_master_gain(master_gain);
    engine.play();
    let total = composition.loop_samples(sample_rate) * loops.max(1) as u64;
    Ok(engine.render_mono(total as usize))
}

/// Run a full export: audio first, then video frames when a frame sink is given.
pub fn export(
    composition: &Composition,
    settings: &ExportSettings,
    audio: &mut dyn AudioSink,
    video: Option<&mut dyn FrameSink>,
) -> Result<ExportReport> {
    tracing::info!(
        title = %composition.title,
        sample_rate = settings.sample_rate,
        loops = settings.loops,
        "export started"
    );
    let pcm = render_sequence(composition, settings.sample_rate, settings.loops, settings.master_gain)?;
    audio.write_audio(&pcm, settings.sample_rate)?;

    let clock = FrameClock::offline(settings.sample_rate, settings.fps);
    let mut report = ExportReport {
        samples: pcm.len() as u64,
        frames_total: clock.frames_for(pcm.len() as u64),
        ..ExportReport::default()
    };

    let Some(video) = video else {
        tracing::info!(samples = report.samples, "export finished (audio only)");
        return Ok(report);
    };

    let samples_per_step = composition.samples_per_step(settings.sample_rate) as u64;
    let mut canvas = Canvas::new(settings.width, settings.height);
    for frame in 0..report.frames_total {
        let position = clock.sample_at(frame);
        let view = SceneView {
            composition,
            current_step: current_step(position, samples_per_step, composition.step_count),
            playing: true,
            preview: false,
            width: settings.width as f32,
            height: settings.height as f32,
        };
        canvas.draw(&build_scene(&view));
        match video.push_frame(canvas.pixels())? {
            FrameStatus::Accepted => report.frames += 1,
            FrameStatus::Refused => {
                tracing::warn!(frame, "encoder refused frame, finalizing early");
                report.finished_early = true;
                break;
            }
        }
        if frame % (settings.fps.max(1) as u64 * 10) == 0 {
            tracing::debug!(frame, total = report.frames_total, "export progress");
        }
    }
    video.finish()?;
    tracing::info!(
        frames = report.frames,
        total = report.frames_total,
        early = report.finished_early,
        "export finished"
    );
    Ok(report)
}

/// Audio sink for `path`: WAV files are written directly, any other
/// extension is encoded by ffmpeg.
pub fn audio_sink(path: &Path, config: &BeeperConfig) -> Box<dyn AudioSink> {
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        Box::new(WavFile::new(path, config.audio.channels))
    } else {
        Box::new(FfmpegAudio::new(&config.export.ffmpeg, path, config.audio.channels))
    }
}

/// Render the configured loops to a single audio file.
pub fn render_audio_file(composition: &Composition, config: &BeeperConfig, path: &Path) -> Result<ExportReport> {
    let settings = ExportSettings::from_config(config);
    let mut sink = audio_sink(path, config);
    export(composition, &settings, sink.as_mut(), None)
}

/// Export to the WAV and video files named in the config.
pub fn export_to_files(composition: &Composition, config: &BeeperConfig) -> Result<ExportReport> {
    let settings = ExportSettings::from_config(config);
    let mut audio = WavFile::new(&config.export.audio_path, config.audio.channels);
    let mut video = FfmpegVideo::new(
        &config.export.ffmpeg,
        &config.export.audio_path,
        &config.export.video_path,
        settings.width,
        settings.height,
        settings.fps,
    );
    export(composition, &settings, &mut audio, Some(&mut video))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_ir::{StepSettings, TrackRole};

    struct Collect {
        samples: Vec<f32>,
    }

    impl AudioSink for Collect {
        fn write_audio(&mut self, samples: &[f32], _: u32) -> Result<()> {
            self.samples = samples.to_vec();
            Ok(())
        }
    }

    struct Frames {
        frames: Vec<Vec<u8>>,
        limit: usize,
        finished: bool,
    }

    impl FrameSink for Frames {
        fn push_frame(&mut self, rgba: &[u8]) -> Result<FrameStatus> {
            if self.frames.len() == self.limit {
                return Ok(FrameStatus::Refused);
            }
            self.frames.push(rgba.to_vec());
            Ok(FrameStatus::Accepted)
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn small() -> Composition {
        let mut comp = Composition::new("small", 4, 5).with_track("a", TrackRole::Rhythmic, 1.0);
        comp.set_step(0, 2, StepSettings::new(100.0, 0.0, 0.0));
        comp
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            sample_rate: 8000,
            fps: 10,
            width: 32,
            height: 24,
            loops: 1,
            master_gain: 1.0,
        }
    }

    #[test]
    fn offline_clock_has_no_offset() {
        let clock = FrameClock::offline(44100, 60);
        assert_eq!(clock.sample_at(1), 735);
        assert_eq!(clock.sample_at(0), 0);
        assert_eq!(clock.sample_at(60), 44100);
    }

    #[test]
    fn preview_clock_lags_by_latency() {
        let clock = FrameClock::preview(48000, 60, 50);
        assert_eq!(clock.sample_at(0), 0);
        assert_eq!(clock.sample_at(10), 8000 - 2400);
    }

    #[test]
    fn uneven_rate_does_not_drift() {
        let clock = FrameClock::offline(44100, 144);
        assert_eq!(clock.sample_at(1), 306);
        assert_eq!(clock.sample_at(4), 1225);
        // Twelve seconds land on the exact sample, not 10 ms early.
        assert_eq!(clock.sample_at(144 * 12), 44100 * 12);
        assert_eq!(clock.frames_for(44100 * 12), 144 * 12);
        assert_eq!(clock.frames_for(44100 * 12 + 1), 144 * 12 + 1);
    }

    #[test]
    fn frames_cover_the_whole_render() {
        let clock = FrameClock::offline(8000, 10);
        assert_eq!(clock.frames_for(6400), 8);
        assert_eq!(clock.frames_for(6401), 9);
    }

    #[test]
    fn render_sequence_length_follows_loops() {
        let comp = small();
        assert_eq!(render_sequence(&comp, 8000, 1, 1.0).unwrap().len(), 6400);
        assert_eq!(render_sequence(&comp, 8000, 3, 1.0).unwrap().len(), 19200);
    }

    #[test]
    fn render_sequence_is_deterministic() {
        let comp = Composition::demo();
        let a = render_sequence(&comp, 8000, 1, 1.0).unwrap();
        let b = render_sequence(&comp, 8000, 1, 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_composition_is_rejected() {
        let comp = Composition::new("empty", 0, 5);
        assert!(render_sequence(&comp, 8000, 1, 1.0).is_err());
    }

    #[test]
    fn full_export_feeds_every_frame() {
        let mut audio = Collect { samples: Vec::new() };
        let mut video = Frames {
            frames: Vec::new(),
            limit: usize::MAX,
            finished: false,
        };
        let report = export(&small(), &settings(), &mut audio, Some(&mut video)).unwrap();
        assert_eq!(audio.samples.len(), 6400);
        assert_eq!(report.frames_total, 8);
        assert_eq!(report.frames, 8);
        assert!(!report.finished_early);
        assert!(video.finished);
        assert!(video.frames.iter().all(|f| f.len() == 32 * 24 * 4));
    }

    #[test]
    fn refused_frame_ends_export_and_finalizes() {
        let mut audio = Collect { samples: Vec::new() };
        let mut video = Frames {
            frames: Vec::new(),
            limit: 3,
            finished: false,
        };
        let report = export(&small(), &settings(), &mut audio, Some(&mut video)).unwrap();
        assert_eq!(report.frames, 3);
        assert!(report.finished_early);
        assert!(video.finished);
        assert_eq!(audio.samples.len(), 6400);
    }

    #[test]
    fn audio_only_export_skips_video() {
        let mut audio = Collect { samples: Vec::new() };
        let report = export(&small(), &settings(), &mut audio, None).unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(report.samples, 6400);
    }
}
