//! autopuller: pull and restart a compose deployment when its branch moves.
//!
//! # Usage
//!
//! ```text
//! autopuller [run]
//! autopuller check [--json]
//! autopuller config [--json]
//! autopuller env [--output <dir>] [--repo <owner/repo>]
//! autopuller systemd [--output <dir>] [--user <user>] [--name <name>]
//! autopuller version
//! ```
//!
//! Settings come from the process environment after `.env` (or
//! `.env.sample`) in the working directory has been applied.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    check::CheckArgs, config::ConfigArgs, env::EnvArgs, run::RunArgs, systemd::SystemdArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "autopuller",
    version,
    about = "Watch a GitHub branch and redeploy a compose stack when CI passes",
    long_about = None,
)]
struct Cli {
    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the remote branch and deploy new commits until stopped.
    Run(RunArgs),

    /// Run a single update pass and report what happened.
    Check(CheckArgs),

    /// Show the resolved configuration.
    Config(ConfigArgs),

    /// Write a commented `.env.sample`.
    Env(EnvArgs),

    /// Write a systemd unit that runs the daemon.
    Systemd(SystemdArgs),

    /// Print the version.
    Version,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run(RunArgs {})) {
        Commands::Run(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Config(args) => args.run(),
        Commands::Env(args) => args.run(),
        Commands::Systemd(args) => args.run(),
        Commands::Version => {
            println!("autopuller {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
