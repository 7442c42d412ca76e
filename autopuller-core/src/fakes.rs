//! In-memory fakes for the capability traits (testing only).
//!
//! All three fakes can share one [`CallLog`] so a test can assert the exact
//! order in which the orchestrator touched its collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::error::{CommandError, LocalStateError, RemoteError};
use crate::traits::{DeploymentExecutor, LocalStateStore, RemoteStateSource};
use crate::types::{ChangeSet, CiResult, CommitId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    HeadCommit,
    CiResult(CommitId),
    ChangeSet(CommitId, CommitId),
    CurrentState,
    SetCurrent(CommitId),
    Pull,
    Restart,
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == wanted).count()
    }

    pub fn deploy_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Pull | Call::Restart))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FakeRemote
// ---------------------------------------------------------------------------

/// `None` in any slot makes the corresponding query fail.
#[derive(Debug)]
pub struct FakeRemote {
    head: Mutex<Option<CommitId>>,
    ci: Mutex<Option<CiResult>>,
    changes: Mutex<Option<ChangeSet>>,
    log: CallLog,
}

impl FakeRemote {
    pub fn new(log: CallLog) -> Self {
        Self {
            head: Mutex::new(None),
            ci: Mutex::new(Some(CiResult::Pending)),
            changes: Mutex::new(Some(ChangeSet::default())),
            log,
        }
    }

    pub fn with_head(self, head: &str) -> Self {
        self.set_head(head);
        self
    }

    pub fn with_ci(self, ci: CiResult) -> Self {
        *self.ci.lock().unwrap() = Some(ci);
        self
    }

    pub fn with_changes(self, files: &[&str]) -> Self {
        *self.changes.lock().unwrap() =
            Some(files.iter().map(|f| f.to_string()).collect::<ChangeSet>());
        self
    }

    pub fn failing_ci(self) -> Self {
        *self.ci.lock().unwrap() = None;
        self
    }

    pub fn failing_changes(self) -> Self {
        *self.changes.lock().unwrap() = None;
        self
    }

    pub fn set_head(&self, head: &str) {
        *self.head.lock().unwrap() = Some(CommitId::from(head));
    }

    pub fn clear_head(&self) {
        *self.head.lock().unwrap() = None;
    }
}

#[async_trait]
impl RemoteStateSource for FakeRemote {
    async fn head_commit(&self, cancel: &Cancellation) -> Result<CommitId, RemoteError> {
        self.log.push(Call::HeadCommit);
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        self.head
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::from_status("fake://commits", 404))
    }

    async fn ci_result(
        &self,
        commit: &CommitId,
        cancel: &Cancellation,
    ) -> Result<CiResult, RemoteError> {
        self.log.push(Call::CiResult(commit.clone()));
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        self.ci
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Transport {
                url: "fake://actions/runs".into(),
                message: "connection reset".into(),
            })
    }

    async fn change_set(
        &self,
        old: &CommitId,
        new: &CommitId,
        cancel: &Cancellation,
    ) -> Result<ChangeSet, RemoteError> {
        self.log.push(Call::ChangeSet(old.clone(), new.clone()));
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        self.changes
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::from_status("fake://compare", 500))
    }
}

// ---------------------------------------------------------------------------
// MemoryStateStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MemoryStateStore {
    current: Mutex<Option<CommitId>>,
    fail_writes: bool,
    log: CallLog,
}

impl MemoryStateStore {
    pub fn new(log: CallLog, current: Option<&str>) -> Self {
        Self {
            current: Mutex::new(current.map(CommitId::from)),
            fail_writes: false,
            log,
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn value(&self) -> Option<CommitId> {
        self.current.lock().unwrap().clone()
    }
}

impl LocalStateStore for MemoryStateStore {
    fn current(&self) -> Result<CommitId, LocalStateError> {
        self.log.push(Call::CurrentState);
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| LocalStateError::NotFound {
                path: "memory://current".into(),
            })
    }

    fn set_current(&self, commit: &CommitId) -> Result<(), LocalStateError> {
        self.log.push(Call::SetCurrent(commit.clone()));
        if self.fail_writes {
            return Err(LocalStateError::Io {
                path: "memory://current".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        *self.current.lock().unwrap() = Some(commit.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeExecutor
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakeExecutor {
    pull_fails: bool,
    restart_fails: bool,
    log: CallLog,
}

impl FakeExecutor {
    pub fn new(log: CallLog) -> Self {
        Self {
            pull_fails: false,
            restart_fails: false,
            log,
        }
    }

    pub fn failing_pull(mut self) -> Self {
        self.pull_fails = true;
        self
    }

    pub fn failing_restart(mut self) -> Self {
        self.restart_fails = true;
        self
    }
}

fn failed(command: &str, output: &str) -> CommandError {
    CommandError::Failed {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        code: Some(1),
        output: output.to_string(),
    }
}

#[async_trait]
impl DeploymentExecutor for FakeExecutor {
    async fn pull(&self, cancel: &Cancellation) -> Result<(), CommandError> {
        self.log.push(Call::Pull);
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                command: "git pull".into(),
            });
        }
        if self.pull_fails {
            return Err(failed("git pull", "merge conflict"));
        }
        Ok(())
    }

    async fn restart(&self, cancel: &Cancellation) -> Result<(), CommandError> {
        self.log.push(Call::Restart);
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                command: "docker-compose build".into(),
            });
        }
        if self.restart_fails {
            return Err(failed("docker-compose up -d", "service web failed to start"));
        }
        Ok(())
    }
}
