use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime and systemd management.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] autopuller_core::ConfigError),

    /// A configured command line could not be used (bad quoting, empty).
    #[error("command setup error: {0}")]
    Command(#[from] autopuller_core::CommandError),

    #[error("render error: {0}")]
    Render(#[from] autopuller_renderer::RenderError),

    /// A deploy step failed; the daemon stops so the supervisor notices.
    #[error("deploy failed: {0}")]
    Deploy(#[source] autopuller_core::OrchestrationError),

    /// A read step of a single check failed.
    #[error("update check failed: {0}")]
    Check(#[source] autopuller_core::OrchestrationError),

    #[error("signal handler error: {0}")]
    Signal(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
