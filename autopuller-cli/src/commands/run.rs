//! `autopuller run`: the foreground daemon loop.

use anyhow::{Context, Result};
use clap::Args;

use autopuller_daemon::start_blocking;

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        start_blocking(config).context("daemon exited with error")?;
        Ok(())
    }
}
