//! Encoder collaborators: where exported audio and video frames go.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use bp_engine::Frame;

use crate::error::{MasterError, Result};
use crate::wav;

/// Whether the encoder took a video frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Accepted,
    /// The encoder will take no more frames; stop feeding and finalize.
    Refused,
}

/// Receives the complete mono render of the sequence.
pub trait AudioSink {
    fn write_audio(&mut self, samples: &[f32], sample_rate: u32) -> Result<()>;
}

/// Receives fixed-size RGBA frames, then end-of-stream.
pub trait FrameSink {
    fn push_frame(&mut self, rgba: &[u8]) -> Result<FrameStatus>;
    fn finish(&mut self) -> Result<()>;
}

/// Writes a 16-bit PCM WAV file.
#[derive(Debug, Clone)]
pub struct WavFile {
    path: PathBuf,
    channels: u16,
}

impl WavFile {
    pub fn new(path: impl Into<PathBuf>, channels: u16) -> Self {
        Self {
            path: path.into(),
            channels,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavFile {
    fn write_audio(&mut self, samples: &[f32], sample_rate: u32) -> Result<()> {
        let frames = wav::mono_to_frames(samples);
        let mut out = BufWriter::new(File::create(&self.path)?);
        wav::write_wav(&mut out, &frames, sample_rate, self.channels)?;
        out.flush()?;
        tracing::info!(path = %self.path.display(), samples = samples.len(), "wrote audio");
        Ok(())
    }
}

/// Encodes raw PCM through an external ffmpeg process.
#[derive(Debug, Clone)]
pub struct FfmpegAudio {
    ffmpeg: PathBuf,
    output: PathBuf,
    channels: u16,
}

impl FfmpegAudio {
    pub fn new(ffmpeg: impl Into<PathBuf>, output: impl Into<PathBuf>, channels: u16) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            output: output.into(),
            channels: channels.max(1),
        }
    }

    pub fn args(&self, sample_rate: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-f", "s16le"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push("-ar".into());
        args.push(sample_rate.to_string().into());
        args.push("-ac".into());
        args.push(self.channels.to_string().into());
        args.push("-i".into());
        args.push("-".into());
        args.push(self.output.clone().into_os_string());
        args
    }
}

impl AudioSink for FfmpegAudio {
    fn write_audio(&mut self, samples: &[f32], sample_rate: u32) -> Result<()> {
        let mut child = spawn(&self.ffmpeg, &self.args(sample_rate))?;
        let mut pcm = Vec::with_capacity(samples.len() * 2 * self.channels as usize);
        for &sample in samples {
            let frame = Frame::from_sample(sample);
            for _ in 0..self.channels {
                pcm.extend_from_slice(&frame.left.to_le_bytes());
            }
        }
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&pcm)?;
        }
        wait(child)
    }
}

/// Pipes raw RGBA frames into ffmpeg and muxes them with an audio file.
///
/// The process is started on the first frame, so the audio file only has to
/// exist by then.
#[derive(Debug)]
pub struct FfmpegVideo {
    ffmpeg: PathBuf,
    audio: PathBuf,
    output: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegVideo {
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            audio: audio.into(),
            output: output.into(),
            width,
            height,
            fps: fps.max(1),
            child: None,
            stdin: None,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push("-s".into());
        args.push(format!("{}x{}", self.width, self.height).into());
        args.push("-r".into());
        args.push(self.fps.to_string().into());
        args.push("-i".into());
        args.push("-".into());
        args.push("-i".into());
        args.push(self.audio.clone().into_os_string());
        for arg in ["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"] {
            args.push(arg.into());
        }
        args.push(self.output.clone().into_os_string());
        args
    }
}

impl FrameSink for FfmpegVideo {
    fn push_frame(&mut self, rgba: &[u8]) -> Result<FrameStatus> {
        if rgba.len() != self.frame_len() {
            return Err(MasterError::Encoder(format!(
                "frame is {} bytes, expected {}",
                rgba.len(),
                self.frame_len()
            )));
        }
        if self.child.is_none() {
            let mut child = spawn(&self.ffmpeg, &self.args())?;
            self.stdin = child.stdin.take();
            self.child = Some(child);
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(FrameStatus::Refused);
        };
        match stdin.write_all(rgba) {
            Ok(()) => Ok(FrameStatus::Accepted),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                self.stdin = None;
                Ok(FrameStatus::Refused)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.stdin.take());
        match self.child.take() {
            Some(child) => wait(child),
            None => Ok(()),
        }
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}

fn spawn(ffmpeg: &Path, args: &[OsString]) -> Result<Child> {
    tracing::debug!(program = %ffmpeg.display(), ?args, "starting encoder");
    Command::new(ffmpeg)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|e| MasterError::Encoder(format!("cannot start {}: {e}", ffmpeg.display())))
}

fn wait(mut child: Child) -> Result<()> {
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(MasterError::Encoder(format!("encoder exited with {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut sink = WavFile::new(&path, 2);
        sink.write_audio(&[0.0; 10], 44100).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 10 * 4);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn video_args_describe_raw_rgba_input() {
        let video = FfmpegVideo::new("ffmpeg", "a.wav", "v.mp4", 320, 240, 30);
        let args: Vec<String> = video
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 320x240 -r 30 -i -"));
        assert!(joined.contains("-i a.wav"));
        assert_eq!(args.last().map(String::as_str), Some("v.mp4"));
        assert_eq!(video.frame_len(), 320 * 240 * 4);
    }

    #[test]
    fn audio_args_describe_pcm_input() {
        let audio = FfmpegAudio::new("ffmpeg", "a.ogg", 2);
        let joined: Vec<String> = audio
            .args(48000)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(joined.join(" ").contains("-f s16le -ar 48000 -ac 2 -i - a.ogg"));
    }

    #[test]
    fn wrong_frame_size_is_an_error() {
        let mut video = FfmpegVideo::new("ffmpeg", "a.wav", "v.mp4", 2, 2, 30);
        assert!(matches!(
            video.push_frame(&[0; 3]),
            Err(MasterError::Encoder(_))
        ));
    }

    #[test]
    fn missing_encoder_reports_spawn_failure() {
        let mut video = FfmpegVideo::new("/nonexistent/ffmpeg", "a.wav", "v.mp4", 1, 1, 30);
        assert!(matches!(
            video.push_frame(&[0; 4]),
            Err(MasterError::Encoder(_))
        ));
        assert!(video.finish().is_ok());
    }
}
