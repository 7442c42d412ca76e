//! `git pull` + compose rebuild as the production [`DeploymentExecutor`].

use std::path::PathBuf;

use async_trait::async_trait;
use autopuller_core::{Cancellation, CommandError, Config, DeploymentExecutor};

use crate::runner::{run, split_line, CommandSpec};

#[derive(Debug, Clone)]
pub struct ComposeDeployer {
    repo_dir: PathBuf,
    compose_dir: PathBuf,
    compose_command: Vec<String>,
    force_pull: bool,
}

impl ComposeDeployer {
    /// Fails only if `DOCKERCOMMAND` cannot be split into words.
    pub fn new(config: &Config) -> Result<Self, CommandError> {
        Ok(Self {
            repo_dir: config.repo_dir.clone(),
            compose_dir: config.compose_dir.clone(),
            compose_command: split_line(&config.compose_command)?,
            force_pull: config.force_pull,
        })
    }

    pub fn pull_steps(&self) -> Vec<CommandSpec> {
        let git = |args: &[&str]| {
            CommandSpec::new("git", &self.repo_dir).args(args.iter().copied())
        };
        vec![
            git(&["config", "credential.helper", "store"]),
            git(&["config", "--global", "--add", "safe.directory"])
                .arg(self.repo_dir.display().to_string()),
            git(&["pull"]),
        ]
    }

    pub fn restart_steps(&self) -> Vec<CommandSpec> {
        let compose = |args: &[&str]| {
            let (program, base) = match self.compose_command.split_first() {
                Some((program, base)) => (program.as_str(), base),
                None => ("docker-compose", &[][..]),
            };
            CommandSpec::new(program, &self.compose_dir)
                .args(base.iter().cloned())
                .args(args.iter().copied())
        };

        let mut build = compose(&["build"]);
        if self.force_pull {
            build = build.arg("--pull");
        }
        vec![build, compose(&["up", "-d"]), compose(&["restart"])]
    }
}

async fn run_steps(
    phase: &str,
    steps: &[CommandSpec],
    cancel: &Cancellation,
) -> Result<(), CommandError> {
    for step in steps {
        tracing::info!(phase, command = %step.display(), "running");
        match run(step, cancel).await {
            Ok(out) => {
                tracing::debug!(phase, command = %step.display(), output = %out.output, "ok");
            }
            Err(err) => {
                if let CommandError::Failed { output, .. } = &err {
                    tracing::error!(phase, command = %step.display(), output = %output, "step failed");
                }
                return Err(err);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DeploymentExecutor for ComposeDeployer {
    async fn pull(&self, cancel: &Cancellation) -> Result<(), CommandError> {
        run_steps("pull", &self.pull_steps(), cancel).await
    }

    async fn restart(&self, cancel: &Cancellation) -> Result<(), CommandError> {
        run_steps("restart", &self.restart_steps(), cancel).await
    }
}
