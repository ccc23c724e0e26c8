use std::path::PathBuf;

use bp_audio::AudioError;

/// Result alias that carries [`MasterError`].
pub type Result<T> = std::result::Result<T, MasterError>;

/// Common error type for the controller, configuration and export paths.
#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    #[error("config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("encoder: {0}")]
    Encoder(String),
    #[error("invalid composition: {0}")]
    Composition(#[from] bp_ir::CompositionError),
}
