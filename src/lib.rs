//! Reload host for the beeper synth.
//!
//! The host has no behaviour of its own beyond the loop: it loads the
//! module, feeds it input and a renderer every frame, and swaps in a new
//! build when one appears. Building without the default `hot-reload`
//! feature links the module in directly instead.

pub mod draw;
pub mod error;
pub mod host;
pub mod input;
#[cfg(feature = "hot-reload")]
pub mod reload;

pub use error::HostError;
pub use host::{ModuleHost, StaticHost};
#[cfg(feature = "hot-reload")]
pub use reload::{should_reload, ArtifactWatch, ReloadHost};

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
