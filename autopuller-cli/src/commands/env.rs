//! `autopuller env`: write a commented `.env.sample`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use autopuller_daemon::paths::env_sample_path;
use autopuller_renderer::{write_output, EnvSampleContext, Renderer};

#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Directory to write `.env.sample` into.
    #[arg(long, short = 'o', default_value = ".")]
    pub output: PathBuf,

    /// Pre-fill REPONAME with this `owner/repo`.
    #[arg(long)]
    pub repo: Option<String>,
}

impl EnvArgs {
    pub fn run(self) -> Result<()> {
        let mut ctx = EnvSampleContext::default();
        if let Some(repo) = self.repo {
            ctx = ctx.with_repo(repo);
        }

        let contents = Renderer::new()?
            .render_env_sample(&ctx)
            .context("failed to render .env.sample")?;
        let path = env_sample_path(&self.output);
        write_output(&path, &contents)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!("{} wrote {}", "✓".green(), path.display());
        println!("  copy it to .env and fill in REPONAME and GITHUBKEY");
        Ok(())
    }
}
