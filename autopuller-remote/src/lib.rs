//! Hosting-API client: the production [`RemoteStateSource`] for GitHub.
//!
//! [`RemoteStateSource`]: autopuller_core::RemoteStateSource

pub mod github;

pub use github::GitHubClient;
