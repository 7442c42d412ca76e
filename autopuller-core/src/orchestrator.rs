//! Update decision: one pass of fetch, compare, gate, diff, pull, restart
//! and persist.
//!
//! The pass is strictly sequential and never retries; a failed pass is
//! retried by the next scheduled one. Everything up to the diff is a read. Pull and restart
//! only run once every gate has passed, and the local state is only advanced
//! after both succeeded.

use serde::Serialize;

use crate::cancel::Cancellation;
use crate::error::OrchestrationError;
use crate::traits::{DeploymentExecutor, LocalStateStore, RemoteStateSource};
use crate::types::{ChangeSet, CiResult, CommitId};

/// Why a pass ended without deploying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoOpReason {
    /// Remote head equals the local commit.
    UpToDate { commit: CommitId },
    /// CI reported something other than success for the remote head.
    CiNotSuccessful { commit: CommitId, result: CiResult },
    /// The CI lookup itself failed; unknown status never deploys.
    CiUnconfirmed { commit: CommitId, error: String },
    /// CI passed but no file differs between the two commits.
    NoChangedFiles { from: CommitId, to: CommitId },
}

/// Result of a pass that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    NoOp(NoOpReason),
    Deployed {
        from: CommitId,
        to: CommitId,
        changes: ChangeSet,
    },
}

impl Outcome {
    pub fn is_deployed(&self) -> bool {
        matches!(self, Outcome::Deployed { .. })
    }
}

/// The decision core. Owns its three collaborators.
pub struct UpdateOrchestrator<R, L, D> {
    remote: R,
    local: L,
    deploy: D,
}

impl<R, L, D> UpdateOrchestrator<R, L, D>
where
    R: RemoteStateSource,
    L: LocalStateStore,
    D: DeploymentExecutor,
{
    pub fn new(remote: R, local: L, deploy: D) -> Self {
        Self {
            remote,
            local,
            deploy,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn deploy(&self) -> &D {
        &self.deploy
    }

    /// Run one pass.
    pub async fn check_for_updates(
        &self,
        cancel: &Cancellation,
    ) -> Result<Outcome, OrchestrationError> {
        let remote = self
            .remote
            .head_commit(cancel)
            .await
            .map_err(OrchestrationError::RemoteFetch)?;

        let local = self
            .local
            .current()
            .map_err(OrchestrationError::LocalState)?;

        if remote == local {
            tracing::debug!(commit = %remote, "local checkout is up to date");
            return Ok(Outcome::NoOp(NoOpReason::UpToDate { commit: remote }));
        }

        tracing::info!(remote = %remote, local = %local, "remote head differs from local commit");

        let ci = match self.remote.ci_result(&remote, cancel).await {
            Ok(ci) => ci,
            Err(err) => {
                tracing::warn!(
                    commit = %remote,
                    error = %err,
                    "could not confirm CI result, withholding deploy",
                );
                return Ok(Outcome::NoOp(NoOpReason::CiUnconfirmed {
                    commit: remote,
                    error: err.to_string(),
                }));
            }
        };

        if !ci.is_success() {
            tracing::info!(
                commit = %remote,
                conclusion = %ci,
                "CI has not passed for remote head, skipping deploy",
            );
            return Ok(Outcome::NoOp(NoOpReason::CiNotSuccessful {
                commit: remote,
                result: ci,
            }));
        }

        let changes = self
            .remote
            .change_set(&local, &remote, cancel)
            .await
            .map_err(OrchestrationError::DiffFetch)?;

        if changes.is_empty() {
            tracing::info!(remote = %remote, local = %local, "no files changed, nothing to deploy");
            return Ok(Outcome::NoOp(NoOpReason::NoChangedFiles {
                from: local,
                to: remote,
            }));
        }

        tracing::info!(
            remote = %remote,
            local = %local,
            changed_files = changes.len(),
            "CI passed, deploying",
        );

        self.deploy
            .pull(cancel)
            .await
            .map_err(OrchestrationError::Pull)?;

        self.deploy
            .restart(cancel)
            .await
            .map_err(OrchestrationError::Restart)?;

        self.local
            .set_current(&remote)
            .map_err(OrchestrationError::PersistState)?;

        tracing::info!(from = %local, to = %remote, "deploy completed");
        Ok(Outcome::Deployed {
            from: local,
            to: remote,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancellation;
    use crate::error::{CommandError, LocalStateError, RemoteError};
    use crate::fakes::{Call, CallLog, FakeExecutor, FakeRemote, MemoryStateStore};

    type Fixture = UpdateOrchestrator<FakeRemote, MemoryStateStore, FakeExecutor>;

    fn fixture(
        log: &CallLog,
        remote: FakeRemote,
        local: Option<&str>,
        executor: FakeExecutor,
    ) -> Fixture {
        UpdateOrchestrator::new(remote, MemoryStateStore::new(log.clone(), local), executor)
    }

    fn deployable(log: &CallLog) -> FakeRemote {
        FakeRemote::new(log.clone())
            .with_head("new_sha")
            .with_ci(CiResult::Success)
            .with_changes(&["app.py"])
    }

    // ─── Concrete scenarios ────────────────────────────────────────────────

    #[tokio::test]
    async fn equal_commits_are_a_noop_without_deploy() {
        let log = CallLog::new();
        let orch = fixture(
            &log,
            FakeRemote::new(log.clone()).with_head("abc123"),
            Some("abc123"),
            FakeExecutor::new(log.clone()),
        );

        let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::NoOp(NoOpReason::UpToDate {
                commit: CommitId::from("abc123")
            })
        );
        assert_eq!(log.calls(), vec![Call::HeadCommit, Call::CurrentState]);
    }

    #[tokio::test]
    async fn successful_ci_with_changes_deploys_and_records_commit() {
        let log = CallLog::new();
        let orch = fixture(&log, deployable(&log), Some("old_sha"), FakeExecutor::new(log.clone()));

        let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Deployed {
                from: CommitId::from("old_sha"),
                to: CommitId::from("new_sha"),
                changes: ChangeSet(vec!["app.py".into()]),
            }
        );
        assert_eq!(orch.local().value(), Some(CommitId::from("new_sha")));
        assert_eq!(
            log.calls(),
            vec![
                Call::HeadCommit,
                Call::CurrentState,
                Call::CiResult(CommitId::from("new_sha")),
                Call::ChangeSet(CommitId::from("old_sha"), CommitId::from("new_sha")),
                Call::Pull,
                Call::Restart,
                Call::SetCurrent(CommitId::from("new_sha")),
            ]
        );
    }

    #[tokio::test]
    async fn failed_ci_blocks_deploy() {
        let log = CallLog::new();
        let remote = deployable(&log).with_ci(CiResult::Failure);
        let orch = fixture(&log, remote, Some("old_sha"), FakeExecutor::new(log.clone()));

        let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::NoOp(NoOpReason::CiNotSuccessful {
                commit: CommitId::from("new_sha"),
                result: CiResult::Failure,
            })
        );
        assert!(log.deploy_calls().is_empty());
        assert_eq!(orch.local().value(), Some(CommitId::from("old_sha")));
    }

    #[tokio::test]
    async fn empty_change_set_is_a_noop() {
        let log = CallLog::new();
        let remote = deployable(&log).with_changes(&[]);
        let orch = fixture(&log, remote, Some("old_sha"), FakeExecutor::new(log.clone()));

        let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::NoOp(NoOpReason::NoChangedFiles {
                from: CommitId::from("old_sha"),
                to: CommitId::from("new_sha"),
            })
        );
        assert!(log.deploy_calls().is_empty());
    }

    #[tokio::test]
    async fn restart_failure_leaves_local_state_untouched() {
        let log = CallLog::new();
        let orch = fixture(
            &log,
            deployable(&log),
            Some("old_sha"),
            FakeExecutor::new(log.clone()).failing_restart(),
        );

        let err = orch
            .check_for_updates(&Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Restart(CommandError::Failed { .. })));
        assert!(err.is_deploy_failure());
        assert_eq!(orch.local().value(), Some(CommitId::from("old_sha")));
        assert_eq!(log.deploy_calls(), vec![Call::Pull, Call::Restart]);
        assert_eq!(log.count(&Call::SetCurrent(CommitId::from("new_sha"))), 0);
    }

    // ─── Gate properties over several inputs ───────────────────────────────

    #[tokio::test]
    async fn non_success_ci_results_never_deploy() {
        for ci in [
            CiResult::Failure,
            CiResult::Pending,
            CiResult::Other("cancelled".into()),
            CiResult::Other("timed_out".into()),
        ] {
            let log = CallLog::new();
            let remote = deployable(&log).with_ci(ci.clone());
            let orch = fixture(&log, remote, Some("old_sha"), FakeExecutor::new(log.clone()));

            let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

            assert!(!outcome.is_deployed(), "{ci} must not deploy");
            assert!(log.deploy_calls().is_empty(), "{ci} must not pull or restart");
            assert_eq!(log.count(&Call::ChangeSet("old_sha".into(), "new_sha".into())), 0);
        }
    }

    #[tokio::test]
    async fn equal_pairs_never_touch_ci_or_deploy() {
        for sha in ["0", "abc123", "0123456789abcdef0123456789abcdef01234567", "main"] {
            let log = CallLog::new();
            let remote = deployable(&log).with_head(sha);
            let orch = fixture(&log, remote, Some(sha), FakeExecutor::new(log.clone()));

            let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

            assert!(matches!(outcome, Outcome::NoOp(NoOpReason::UpToDate { .. })));
            assert_eq!(log.calls(), vec![Call::HeadCommit, Call::CurrentState]);
        }
    }

    // ─── Failure propagation ───────────────────────────────────────────────

    #[tokio::test]
    async fn ci_lookup_failure_is_swallowed_into_noop() {
        let log = CallLog::new();
        let remote = deployable(&log).failing_ci();
        let orch = fixture(&log, remote, Some("old_sha"), FakeExecutor::new(log.clone()));

        let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();

        match outcome {
            Outcome::NoOp(NoOpReason::CiUnconfirmed { commit, error }) => {
                assert_eq!(commit, CommitId::from("new_sha"));
                assert!(error.contains("connection reset"), "got: {error}");
            }
            other => panic!("expected CiUnconfirmed, got {other:?}"),
        }
        assert!(log.deploy_calls().is_empty());
    }

    #[tokio::test]
    async fn head_fetch_failure_aborts_before_reading_local_state() {
        let log = CallLog::new();
        let orch = fixture(
            &log,
            FakeRemote::new(log.clone()),
            Some("old_sha"),
            FakeExecutor::new(log.clone()),
        );

        let err = orch
            .check_for_updates(&Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::RemoteFetch(RemoteError::NotFound { .. })
        ));
        assert!(!err.is_deploy_failure());
        assert_eq!(log.calls(), vec![Call::HeadCommit]);
    }

    #[tokio::test]
    async fn missing_local_state_aborts_with_local_state_error() {
        let log = CallLog::new();
        let orch = fixture(&log, deployable(&log), None, FakeExecutor::new(log.clone()));

        let err = orch
            .check_for_updates(&Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::LocalState(LocalStateError::NotFound { .. })
        ));
        assert!(log.deploy_calls().is_empty());
    }

    #[tokio::test]
    async fn diff_failure_aborts_without_deploy() {
        let log = CallLog::new();
        let remote = deployable(&log).failing_changes();
        let orch = fixture(&log, remote, Some("old_sha"), FakeExecutor::new(log.clone()));

        let err = orch
            .check_for_updates(&Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::DiffFetch(RemoteError::HttpStatus { status: 500, .. })
        ));
        assert!(log.deploy_calls().is_empty());
        assert_eq!(orch.local().value(), Some(CommitId::from("old_sha")));
    }

    #[tokio::test]
    async fn pull_failure_skips_restart_and_keeps_state() {
        let log = CallLog::new();
        let orch = fixture(
            &log,
            deployable(&log),
            Some("old_sha"),
            FakeExecutor::new(log.clone()).failing_pull(),
        );

        let err = orch
            .check_for_updates(&Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Pull(_)));
        assert_eq!(log.deploy_calls(), vec![Call::Pull]);
        assert_eq!(orch.local().value(), Some(CommitId::from("old_sha")));
    }

    #[tokio::test]
    async fn persist_failure_is_reported_after_restart() {
        let log = CallLog::new();
        let orch = UpdateOrchestrator::new(
            deployable(&log),
            MemoryStateStore::new(log.clone(), Some("old_sha")).failing_writes(),
            FakeExecutor::new(log.clone()),
        );

        let err = orch
            .check_for_updates(&Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::PersistState(_)));
        assert!(err.is_deploy_failure());
        assert_eq!(orch.local().value(), Some(CommitId::from("old_sha")));
    }

    #[tokio::test]
    async fn cancelled_pass_reports_cancellation() {
        let log = CallLog::new();
        let (handle, signal) = cancellation();
        handle.cancel();
        let orch = fixture(&log, deployable(&log), Some("old_sha"), FakeExecutor::new(log.clone()));

        let err = orch.check_for_updates(&signal).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(!err.is_deploy_failure());
        assert!(log.deploy_calls().is_empty());
    }

    // ─── Idempotence and no-retry ──────────────────────────────────────────

    #[tokio::test]
    async fn second_pass_after_deploy_is_a_noop() {
        let log = CallLog::new();
        let orch = fixture(&log, deployable(&log), Some("old_sha"), FakeExecutor::new(log.clone()));

        let first = orch.check_for_updates(&Cancellation::never()).await.unwrap();
        let second = orch.check_for_updates(&Cancellation::never()).await.unwrap();

        assert!(first.is_deployed());
        assert_eq!(
            second,
            Outcome::NoOp(NoOpReason::UpToDate {
                commit: CommitId::from("new_sha")
            })
        );
        assert_eq!(log.deploy_calls(), vec![Call::Pull, Call::Restart]);
    }

    #[tokio::test]
    async fn repeated_noop_passes_stay_noop() {
        let log = CallLog::new();
        let remote = deployable(&log).with_ci(CiResult::Pending);
        let orch = fixture(&log, remote, Some("old_sha"), FakeExecutor::new(log.clone()));

        for _ in 0..2 {
            let outcome = orch.check_for_updates(&Cancellation::never()).await.unwrap();
            assert!(matches!(outcome, Outcome::NoOp(NoOpReason::CiNotSuccessful { .. })));
        }
        assert!(log.deploy_calls().is_empty());
    }

    #[tokio::test]
    async fn failed_steps_are_not_retried_within_a_pass() {
        let log = CallLog::new();
        let orch = fixture(
            &log,
            deployable(&log),
            Some("old_sha"),
            FakeExecutor::new(log.clone()).failing_restart(),
        );

        let _ = orch.check_for_updates(&Cancellation::never()).await;

        assert_eq!(log.count(&Call::HeadCommit), 1);
        assert_eq!(log.count(&Call::CiResult("new_sha".into())), 1);
        assert_eq!(log.count(&Call::Pull), 1);
        assert_eq!(log.count(&Call::Restart), 1);
    }

    #[test]
    fn outcome_serializes_with_tags() {
        let outcome = Outcome::NoOp(NoOpReason::CiNotSuccessful {
            commit: CommitId::from("abc"),
            result: CiResult::Failure,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "no_op");
        assert_eq!(json["reason"], "ci_not_successful");
        assert_eq!(json["commit"], "abc");
    }
}
