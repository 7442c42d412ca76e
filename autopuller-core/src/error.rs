//! Error types for autopuller-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the hosting API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 401 or 403 from the API; the token is missing, expired or lacks scope.
    #[error("unauthorized response from {url} (status {status})")]
    Auth { url: String, status: u16 },

    /// 404: the repository, branch or commit is unknown to the API.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The body was not the JSON document we expected.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("remote request cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Build the error for a non-2xx status code.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        match status {
            401 | 403 => RemoteError::Auth { url, status },
            404 => RemoteError::NotFound { url },
            _ => RemoteError::HttpStatus { url, status },
        }
    }
}

/// Failures reading or persisting the deployed commit.
#[derive(Debug, Error)]
pub enum LocalStateError {
    /// No state recorded yet (first run, or the branch ref does not exist).
    #[error("no local commit recorded at {path}")]
    NotFound { path: PathBuf },

    #[error("local commit file {path} is empty")]
    Empty { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of an external process.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process ran and exited unsuccessfully. `output` holds combined
    /// stdout and stderr.
    #[error("`{command}` failed ({status}): {output}")]
    Failed {
        command: String,
        status: String,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid command line '{line}': {message}")]
    Parse { line: String, message: String },

    #[error("`{command}` cancelled")]
    Cancelled { command: String },
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }
}

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting {key} is not set")]
    Missing { key: &'static str },

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to load environment file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

/// Why an orchestration pass stopped early.
///
/// Each variant names the step that failed, so callers can tell read-only
/// failures from deploy failures without inspecting the source error.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("failed to fetch remote head commit: {0}")]
    RemoteFetch(#[source] RemoteError),

    #[error("failed to read local commit: {0}")]
    LocalState(#[source] LocalStateError),

    #[error("failed to fetch change set: {0}")]
    DiffFetch(#[source] RemoteError),

    #[error("pull failed: {0}")]
    Pull(#[source] CommandError),

    #[error("restart failed: {0}")]
    Restart(#[source] CommandError),

    #[error("services restarted but recording the deployed commit failed: {0}")]
    PersistState(#[source] LocalStateError),
}

impl OrchestrationError {
    /// True when the error came from a step that changed the working tree or
    /// the running services.
    pub fn is_deploy_failure(&self) -> bool {
        matches!(
            self,
            OrchestrationError::Pull(_)
                | OrchestrationError::Restart(_)
                | OrchestrationError::PersistState(_)
        ) && !self.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            OrchestrationError::RemoteFetch(e) | OrchestrationError::DiffFetch(e) => {
                matches!(e, RemoteError::Cancelled)
            }
            OrchestrationError::Pull(e) | OrchestrationError::Restart(e) => e.is_cancelled(),
            OrchestrationError::LocalState(_) | OrchestrationError::PersistState(_) => false,
        }
    }
}

/// Convenience constructor for [`LocalStateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LocalStateError {
    LocalStateError::Io {
        path: path.into(),
        source,
    }
}
