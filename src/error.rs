use std::path::PathBuf;

/// Fatal host errors. Every one of these ends the process.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("module artifact {0} not found")]
    MissingArtifact(PathBuf),
    #[error("cannot copy module {path} for loading: {source}")]
    ShadowCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "hot-reload")]
    #[error("cannot load module {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[cfg(feature = "hot-reload")]
    #[error("module {path} does not export `{symbol}`")]
    MissingSymbol {
        path: PathBuf,
        symbol: String,
        #[source]
        source: libloading::Error,
    },
    #[error("module init failed: {reason} (status {code})")]
    InitFailed { code: u32, reason: &'static str },
    #[error("module rejected reloaded state: {reason} (status {code})")]
    HandoffRejected { code: u32, reason: &'static str },
    #[error(transparent)]
    Config(#[from] bp_master::MasterError),
    #[error("window: {0}")]
    Window(String),
}

pub type Result<T> = std::result::Result<T, HostError>;
