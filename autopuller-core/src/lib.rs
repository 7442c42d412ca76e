//! Autopuller core library: domain types, capability traits, local state
//! stores and the update orchestrator.
//!
//! - [`types`]: commit ids, change sets, CI results
//! - [`traits`]: the three collaborators the orchestrator is built from
//! - [`orchestrator`]: one update pass and its [`Outcome`]
//! - [`state`]: the deployed-commit marker and the branch ref that seeds it
//! - [`config`]: environment-driven [`Config`]

pub mod cancel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

pub use cancel::{cancellation, CancelHandle, Cancellation};
pub use config::{load_env_files, Config, NotifyConfig};
pub use error::{CommandError, ConfigError, LocalStateError, OrchestrationError, RemoteError};
pub use orchestrator::{NoOpReason, Outcome, UpdateOrchestrator};
pub use state::{marker_path, store_for, BranchRef, MarkerFileStore};
pub use traits::{DeploymentExecutor, LocalStateStore, RemoteStateSource};
pub use types::{ChangeSet, CiResult, CommitId};
