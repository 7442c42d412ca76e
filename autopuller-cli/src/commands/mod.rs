pub mod check;
pub mod config;
pub mod env;
pub mod run;
pub mod systemd;

use anyhow::{Context, Result};

use autopuller_core::{load_env_files, Config};

/// Apply the working directory's env file, then parse the settings.
pub fn load_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let applied = load_env_files(&cwd).context("failed to apply environment file")?;
    let config = Config::from_env().context("invalid configuration")?;
    Ok(config.with_env_file(applied))
}
