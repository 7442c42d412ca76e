//! `autopuller check`: one update pass against the live remote.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use autopuller_core::{NoOpReason, Outcome};
use autopuller_daemon::{check_once, init_tracing};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    repo: &'a str,
    branch: &'a str,
    checked_at: DateTime<Utc>,
    result: &'a Outcome,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        // JSON output owns stdout.
        if !self.json {
            init_tracing(config.log_json, None)?;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let outcome = runtime
            .block_on(check_once(&config))
            .context("update check failed")?;

        if self.json {
            let report = CheckReport {
                repo: &config.repo,
                branch: &config.branch,
                checked_at: Utc::now(),
                result: &outcome,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_outcome(&config.repo, &outcome);
        }
        Ok(())
    }
}

fn print_outcome(repo: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Deployed { from, to, changes } => {
            println!(
                "{} {repo}: deployed {} -> {} ({} files changed)",
                "✓".green(),
                from.short(),
                to.short().bold(),
                changes.len()
            );
            for path in changes.iter() {
                println!("    {path}");
            }
        }
        Outcome::NoOp(NoOpReason::UpToDate { commit }) => {
            println!("{} {repo}: up to date at {}", "✓".green(), commit.short());
        }
        Outcome::NoOp(NoOpReason::CiNotSuccessful { commit, result }) => {
            println!(
                "{} {repo}: CI for {} is {}, not deploying",
                "!".yellow(),
                commit.short(),
                result.to_string().yellow()
            );
        }
        Outcome::NoOp(NoOpReason::CiUnconfirmed { commit, error }) => {
            println!(
                "{} {repo}: CI status for {} unknown ({error}), not deploying",
                "!".yellow(),
                commit.short()
            );
        }
        Outcome::NoOp(NoOpReason::NoChangedFiles { from, to }) => {
            println!(
                "{} {repo}: no files changed between {} and {}",
                "-".dimmed(),
                from.short(),
                to.short()
            );
        }
    }
}
