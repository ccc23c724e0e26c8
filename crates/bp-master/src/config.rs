//! Runtime configuration, loaded from `beeper.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MasterError, Result};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "BEEPER_CONFIG";
/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "beeper.toml";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeeperConfig {
    pub module: ModuleConfig,
    pub audio: AudioConfig,
    pub mix: MixConfig,
    pub export: ExportConfig,
}

impl BeeperConfig {
    /// Load from `$BEEPER_CONFIG`, else `./beeper.toml`, else defaults.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Self::from_file_or_default(Path::new(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Load `path`, falling back to defaults if it does not exist.
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MasterError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&text).map_err(|message| MasterError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

/// Where the reload host finds the module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Build artifact watched for changes.
    pub library_path: PathBuf,
    /// Present while a build of the artifact is in progress.
    pub lock_path: PathBuf,
    /// Directory that receives a private copy of each loaded artifact.
    pub shadow_dir: PathBuf,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from(default_library_path()),
            lock_path: PathBuf::from("./build/libbp_module.lock"),
            shadow_dir: PathBuf::from("./build/.hot"),
        }
    }
}

fn default_library_path() -> &'static str {
    if cfg!(target_os = "windows") {
        ".\\build\\bp_module.dll"
    } else if cfg!(target_os = "macos") {
        "./build/libbp_module.dylib"
    } else {
        "./build/libbp_module.so"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Cpal,
    Null,
}

impl From<BackendKind> for bp_audio::Backend {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Cpal => bp_audio::Backend::Cpal,
            BackendKind::Null => bp_audio::Backend::Null,
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub backend: BackendKind,
    /// Rate used for offline rendering and by the null backend.
    pub sample_rate: u32,
    /// Channels requested from the live device.
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Cpal,
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Mix weights applied on top of the composition's own gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Per-track gains, in track order.
    pub weights: Vec<f32>,
    pub master_gain: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            weights: vec![0.4, 0.2, 0.9],
            master_gain: 1.0,
        }
    }
}

/// Offline export and preview settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub ffmpeg: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Passes through the step table to render.
    pub loops: u32,
    pub audio_path: PathBuf,
    pub video_path: PathBuf,
    /// Presentation delay compensated in live preview only.
    pub preview_latency_ms: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            width: 900,
            height: 800,
            fps: 60,
            loops: 1,
            audio_path: PathBuf::from("beeper.wav"),
            video_path: PathBuf::from("beeper.mp4"),
            preview_latency_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(BeeperConfig::parse("").unwrap(), BeeperConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = BeeperConfig::parse(
            r#"
            [audio]
            backend = "null"

            [mix]
            weights = [1.0, 0.5]

            [export]
            fps = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.backend, BackendKind::Null);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.mix.weights, vec![1.0, 0.5]);
        assert_eq!(config.mix.master_gain, 1.0);
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.export.width, 900);
        assert_eq!(config.module, ModuleConfig::default());
    }

    #[test]
    fn unknown_backend_is_an_error() {
        assert!(BeeperConfig::parse("[audio]\nbackend = \"jack\"\n").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BeeperConfig::from_file_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, BeeperConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[audio").unwrap();
        let err = BeeperConfig::from_file(file.path()).unwrap_err();
        match err {
            MasterError::Config { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn module_paths_round_trip_through_toml() {
        let config = BeeperConfig::parse(
            "[module]\nlibrary_path = \"out/libm.so\"\nlock_path = \"out/libm.lock\"\n",
        )
        .unwrap();
        assert_eq!(config.module.library_path, PathBuf::from("out/libm.so"));
        assert_eq!(config.module.lock_path, PathBuf::from("out/libm.lock"));
        assert_eq!(config.module.shadow_dir, PathBuf::from("./build/.hot"));
    }
}
