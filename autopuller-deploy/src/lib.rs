//! Side-effecting collaborators: the subprocess runner, the git + compose
//! [`DeploymentExecutor`] and the optional mail notifier.
//!
//! [`DeploymentExecutor`]: autopuller_core::DeploymentExecutor

pub mod executor;
pub mod notify;
pub mod runner;

pub use executor::ComposeDeployer;
pub use notify::{Message, Notifier};
pub use runner::{run, CommandOutput, CommandSpec};
