//! Rendering payloads. Both serialize straight into a `tera::Context`.

use std::path::Path;

use autopuller_core::config::{
    DEFAULT_API_PREFIX, DEFAULT_BRANCH, DEFAULT_COMPOSE_COMMAND, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_INTERVAL_SECS, DEFAULT_LINTING_COMMIT_MSG,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::RenderError;

/// Who generated a file, and when.
#[derive(Debug, Clone, Serialize)]
pub struct MetaCtx {
    pub version: String,
    pub generated_at: DateTime<Utc>,
}

impl Default for MetaCtx {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// systemd unit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UnitContext {
    pub description: String,
    pub working_dir: String,
    /// Full `ExecStart=` value, binary plus arguments.
    pub exec_start: String,
    pub user: String,
}

impl UnitContext {
    /// The daemon runs as `<exe> run` from `working_dir`, where its `.env`
    /// lives.
    pub fn new(service_name: &str, exe: &Path, working_dir: &Path, user: &str) -> Self {
        Self {
            description: format!("{service_name} Service"),
            working_dir: working_dir.display().to_string(),
            exec_start: format!("{} run", exe.display()),
            user: user.to_string(),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

// ---------------------------------------------------------------------------
// .env.sample
// ---------------------------------------------------------------------------

/// Values pre-filled into `.env.sample`. Defaults mirror the daemon's own.
#[derive(Debug, Clone, Serialize)]
pub struct EnvSampleContext {
    pub repo: String,
    pub api_prefix: String,
    pub branch: String,
    pub repo_dir: String,
    pub docker_dir: String,
    pub docker_command: String,
    pub interval: u64,
    pub http_timeout: u64,
    pub sendmail_cmd: String,
    pub linting_commit_msg: String,
    pub meta: MetaCtx,
}

impl Default for EnvSampleContext {
    fn default() -> Self {
        Self {
            repo: "owner/repo".to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            repo_dir: ".".to_string(),
            docker_dir: ".".to_string(),
            docker_command: DEFAULT_COMPOSE_COMMAND.to_string(),
            interval: DEFAULT_INTERVAL_SECS,
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            sendmail_cmd: "mail -s".to_string(),
            linting_commit_msg: DEFAULT_LINTING_COMMIT_MSG.to_string(),
            meta: MetaCtx::default(),
        }
    }
}

impl EnvSampleContext {
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
