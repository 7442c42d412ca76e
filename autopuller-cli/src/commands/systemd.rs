//! `autopuller systemd`: install a unit that runs `autopuller run`.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use autopuller_daemon::paths::{DEFAULT_SERVICE_NAME, SYSTEMD_UNIT_DIR};
use autopuller_daemon::{generate_unit, install_systemd, next_steps};

#[derive(Args, Debug)]
pub struct SystemdArgs {
    /// Directory the unit file is written to.
    #[arg(long, short = 'o', default_value = SYSTEMD_UNIT_DIR)]
    pub output: PathBuf,

    /// Account the service runs as. Defaults to the current user.
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Service name; the file is `<name>.service`.
    #[arg(long, short = 'n', default_value = DEFAULT_SERVICE_NAME)]
    pub name: String,
}

impl SystemdArgs {
    pub fn run(self) -> Result<()> {
        let exe = env::current_exe().context("could not locate the autopuller binary")?;
        let working_dir = env::current_dir().context("could not determine working directory")?;
        let user = self
            .user
            .or_else(|| env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "root".to_string());

        let unit = generate_unit(&self.name, &exe, &working_dir, &user)
            .context("failed to render systemd unit")?;
        let path = install_systemd(&self.output, &self.name, &unit).with_context(|| {
            format!(
                "failed to install unit into {} (try sudo or --output)",
                self.output.display()
            )
        })?;

        println!("{} wrote {}", "✓".green(), path.display());
        println!("next steps:");
        for step in next_steps(&self.name) {
            println!("  {step}");
        }
        Ok(())
    }
}
