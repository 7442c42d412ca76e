//! Daemon configuration.
//!
//! Settings are environment-style keys. [`load_env_files`] applies `.env`
//! (or `.env.sample` when no `.env` exists) without overriding variables
//! already present in the process, then [`Config::from_env`] parses them once
//! into an immutable value that every collaborator borrows.
//!
//! [`Config::from_lookup`] takes an explicit key lookup; tests use it with a
//! map instead of touching the process environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_PREFIX: &str = "https://api.github.com/repos/";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_COMPOSE_COMMAND: &str = "docker-compose";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LINTING_COMMIT_MSG: &str = "Automatic linting fix";

pub const ENV_FILE: &str = ".env";
pub const ENV_SAMPLE_FILE: &str = ".env.sample";

/// Notification hook: `<command> <subject> <recipient>` with the body on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub command: String,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `owner/repo` on the hosting service.
    pub repo: String,
    pub token: Option<String>,
    pub api_prefix: String,
    pub branch: String,
    /// Local checkout that `git pull` updates.
    pub repo_dir: PathBuf,
    /// Directory holding the compose file.
    pub compose_dir: PathBuf,
    /// Restart tool command line, e.g. `docker compose`.
    pub compose_command: String,
    pub force_pull: bool,
    pub interval: Duration,
    /// Deployed-commit marker. `None` uses `<repo_dir>/.git/autopuller-deployed`.
    pub state_file: Option<PathBuf>,
    pub http_timeout: Duration,
    pub notify: Option<NotifyConfig>,
    pub linting_commit_msg: String,
    pub log_file: Option<PathBuf>,
    pub log_json: bool,
    /// Env file applied before parsing, if any.
    pub env_file: Option<PathBuf>,
    /// Values replaced by a default. Parsing runs before logging is set up,
    /// so the daemon reports these once it is.
    pub warnings: Vec<String>,
}

impl Config {
    /// Parse configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let repo = get("REPONAME").ok_or(ConfigError::Missing { key: "REPONAME" })?;
        if !repo.contains('/') || repo.starts_with('/') || repo.ends_with('/') {
            return Err(ConfigError::Invalid {
                key: "REPONAME",
                value: repo,
                reason: "expected owner/repo".to_string(),
            });
        }

        let mut warnings = Vec::new();
        let interval = match get("INTERVAL") {
            None => DEFAULT_INTERVAL_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: "INTERVAL",
                        value: raw,
                        reason: "must be at least 1 second".to_string(),
                    })
                }
                Ok(secs) => secs,
                Err(_) => {
                    warnings.push(format!(
                        "INTERVAL={raw} is not a number, using {DEFAULT_INTERVAL_SECS}s"
                    ));
                    DEFAULT_INTERVAL_SECS
                }
            },
        };

        let http_timeout = match get("HTTP_TIMEOUT") {
            None => DEFAULT_HTTP_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "HTTP_TIMEOUT",
                        value: raw,
                        reason: "expected a positive number of seconds".to_string(),
                    })
                }
            },
        };

        let notify = match (get("SENDMAIL_CMD"), get("NOTIFY_TO")) {
            (Some(command), Some(recipient)) => Some(NotifyConfig { command, recipient }),
            _ => None,
        };

        Ok(Self {
            repo,
            token: get("GITHUBKEY"),
            api_prefix: get("GITHUB_URL_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            branch: get("BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            repo_dir: get("REPODIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            compose_dir: get("DOCKERDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            compose_command: get("DOCKERCOMMAND")
                .unwrap_or_else(|| DEFAULT_COMPOSE_COMMAND.to_string()),
            force_pull: get("FORCEPULL").is_some(),
            interval: Duration::from_secs(interval),
            state_file: get("STATE_FILE").map(PathBuf::from),
            http_timeout: Duration::from_secs(http_timeout),
            notify,
            linting_commit_msg: get("LINTING_COMMIT_MSG")
                .unwrap_or_else(|| DEFAULT_LINTING_COMMIT_MSG.to_string()),
            log_file: get("LOG_FILE").map(PathBuf::from),
            log_json: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            env_file: None,
            warnings,
        })
    }

    /// Record which env file [`load_env_files`] applied.
    pub fn with_env_file(mut self, env_file: Option<PathBuf>) -> Self {
        self.env_file = env_file;
        self
    }
}

/// Apply `<dir>/.env`, or `<dir>/.env.sample` when `.env` is absent.
///
/// Returns the file that was applied, or `None` when neither exists.
/// Variables already set in the process take precedence.
pub fn load_env_files(dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    for name in [ENV_FILE, ENV_SAMPLE_FILE] {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        dotenvy::from_path(&path).map_err(|e| ConfigError::EnvFile {
            path: path.clone(),
            message: e.to_string(),
        })?;
        return Ok(Some(path));
    }
    Ok(None)
}
