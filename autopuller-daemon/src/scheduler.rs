//! The polling loop and the one place the failure policy lives.
//!
//! | Pass result                         | Action                          |
//! |-------------------------------------|---------------------------------|
//! | `Deployed`                          | notify, sleep, next pass        |
//! | `NoOp`                              | sleep, next pass                |
//! | remote head / local state / diff    | log, sleep, next pass           |
//! | pull / restart / persist            | notify, stop with error         |
//! | cancelled                           | stop cleanly                    |

use std::time::Duration;

use autopuller_core::{
    Cancellation, DeploymentExecutor, LocalStateStore, NoOpReason, OrchestrationError, Outcome,
    RemoteStateSource, UpdateOrchestrator,
};
use autopuller_deploy::{Message, Notifier};

use crate::error::DaemonError;

/// What the loop does after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Continue,
    Terminate,
    Stop,
}

impl Policy {
    pub fn for_error(err: &OrchestrationError) -> Self {
        if err.is_cancelled() {
            Policy::Stop
        } else if err.is_deploy_failure() {
            Policy::Terminate
        } else {
            Policy::Continue
        }
    }
}

/// Counters reported when the loop stops cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub deploys: u64,
    pub failed_passes: u64,
}

struct NotifyTarget {
    notifier: Notifier,
    repo: String,
    branch: String,
}

pub struct Scheduler<R, L, D> {
    orchestrator: UpdateOrchestrator<R, L, D>,
    interval: Duration,
    notify: Option<NotifyTarget>,
}

impl<R, L, D> Scheduler<R, L, D>
where
    R: RemoteStateSource,
    L: LocalStateStore,
    D: DeploymentExecutor,
{
    pub fn new(orchestrator: UpdateOrchestrator<R, L, D>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            notify: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier, repo: &str, branch: &str) -> Self {
        self.notify = Some(NotifyTarget {
            notifier,
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        self
    }

    pub fn orchestrator(&self) -> &UpdateOrchestrator<R, L, D> {
        &self.orchestrator
    }

    /// Run passes until cancelled or a deploy step fails.
    pub async fn run(&self, cancel: &Cancellation) -> Result<RunSummary, DaemonError> {
        let mut summary = RunSummary::default();

        while !cancel.is_cancelled() {
            let result = self.orchestrator.check_for_updates(cancel).await;
            summary.passes += 1;

            match result {
                Ok(outcome) => {
                    self.report(&outcome, cancel).await;
                    if outcome.is_deployed() {
                        summary.deploys += 1;
                    }
                }
                Err(err) => match Policy::for_error(&err) {
                    Policy::Stop => break,
                    Policy::Terminate => {
                        tracing::error!(error = %err, "deploy failed, stopping");
                        self.send(|t| Message::failed(&t.repo, &t.branch, &err), cancel)
                            .await;
                        return Err(DaemonError::Deploy(err));
                    }
                    Policy::Continue => {
                        summary.failed_passes += 1;
                        tracing::warn!(
                            error = %err,
                            retry_in_secs = self.interval.as_secs(),
                            "update check failed, retrying next interval",
                        );
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(
            passes = summary.passes,
            deploys = summary.deploys,
            failed_passes = summary.failed_passes,
            "scheduler stopped",
        );
        Ok(summary)
    }

    async fn report(&self, outcome: &Outcome, cancel: &Cancellation) {
        match outcome {
            Outcome::Deployed { from, to, changes } => {
                self.send(|t| Message::deployed(&t.repo, &t.branch, from, to, changes), cancel)
                    .await;
            }
            Outcome::NoOp(NoOpReason::UpToDate { .. }) => {}
            Outcome::NoOp(reason) => tracing::debug!(?reason, "pass finished without deploy"),
        }
    }

    async fn send<F>(&self, build: F, cancel: &Cancellation)
    where
        F: FnOnce(&NotifyTarget) -> Message,
    {
        if let Some(target) = &self.notify {
            let message = build(target);
            target.notifier.notify(&message, cancel).await;
        }
    }
}
