//! Capability interfaces injected into the orchestrator.

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::error::{CommandError, LocalStateError, RemoteError};
use crate::types::{ChangeSet, CiResult, CommitId};

/// Read-only queries against the hosting API.
#[async_trait]
pub trait RemoteStateSource: Send + Sync {
    /// Current tip of the tracked branch.
    async fn head_commit(&self, cancel: &Cancellation) -> Result<CommitId, RemoteError>;

    /// Conclusion of the most recent CI run recorded for `commit`.
    /// [`CiResult::Pending`] when no run matches.
    async fn ci_result(
        &self,
        commit: &CommitId,
        cancel: &Cancellation,
    ) -> Result<CiResult, RemoteError>;

    /// Paths that differ between `old` and `new`, in comparison order.
    async fn change_set(
        &self,
        old: &CommitId,
        new: &CommitId,
        cancel: &Cancellation,
    ) -> Result<ChangeSet, RemoteError>;
}

/// Where the currently deployed commit is recorded.
pub trait LocalStateStore: Send + Sync {
    fn current(&self) -> Result<CommitId, LocalStateError>;

    /// Record `commit` as deployed. Implementations must leave the previous
    /// value intact if the write fails part-way.
    fn set_current(&self, commit: &CommitId) -> Result<(), LocalStateError>;
}

/// Side-effecting deploy steps.
#[async_trait]
pub trait DeploymentExecutor: Send + Sync {
    /// Bring the working tree up to the remote tip.
    async fn pull(&self, cancel: &Cancellation) -> Result<(), CommandError>;

    /// Rebuild and restart the managed services.
    async fn restart(&self, cancel: &Cancellation) -> Result<(), CommandError>;
}
