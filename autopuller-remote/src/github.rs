//! GitHub REST client.
//!
//! Three read-only endpoints, all under `{prefix}/{owner}/{repo}`:
//!
//! | Query       | Endpoint                        | Field read                    |
//! |-------------|---------------------------------|-------------------------------|
//! | head commit | `commits/{branch}`              | `sha`                         |
//! | CI result   | `actions/runs`                  | `workflow_runs[].conclusion`  |
//! | change set  | `compare/{old}...{new}`         | `files[].filename`            |
//!
//! `ureq` is blocking, so every request runs on the blocking pool and races
//! the cancellation signal. The agent timeout bounds how long an abandoned
//! request can keep its thread.

use std::time::Duration;

use async_trait::async_trait;
use autopuller_core::{
    Cancellation, ChangeSet, CiResult, CommitId, Config, RemoteError, RemoteStateSource,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RunsResponse {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    head_sha: String,
    #[serde(default)]
    conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    #[serde(default)]
    files: Vec<ChangedFile>,
}

#[derive(Debug, Deserialize)]
struct ChangedFile {
    filename: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GitHubClient {
    agent: ureq::Agent,
    repo_url: String,
    branch: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(
            &config.api_prefix,
            &config.repo,
            &config.branch,
            config.token.clone(),
            config.http_timeout,
        )
    }

    pub fn with_settings(
        api_prefix: &str,
        repo: &str,
        branch: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("autopuller/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            repo_url: format!("{}/{}", api_prefix.trim_end_matches('/'), repo),
            branch: branch.to_string(),
            token,
        }
    }

    pub fn head_url(&self) -> String {
        format!("{}/commits/{}", self.repo_url, self.branch)
    }

    pub fn runs_url(&self) -> String {
        format!("{}/actions/runs", self.repo_url)
    }

    pub fn compare_url(&self, old: &CommitId, new: &CommitId) -> String {
        format!("{}/compare/{}...{}", self.repo_url, old, new)
    }

    async fn get_json<T>(&self, url: String, cancel: &Cancellation) -> Result<T, RemoteError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }

        tracing::debug!(url = %url, "GET");
        let agent = self.agent.clone();
        let token = self.token.clone();
        let request_url = url.clone();
        let request =
            tokio::task::spawn_blocking(move || fetch_json(&agent, &request_url, token.as_deref()));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RemoteError::Cancelled),
            joined = request => match joined {
                Ok(result) => result,
                Err(err) => Err(RemoteError::Transport {
                    url,
                    message: format!("request task failed: {err}"),
                }),
            },
        }
    }
}

fn fetch_json<T: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    token: Option<&str>,
) -> Result<T, RemoteError> {
    let mut request = agent.get(url).set("Accept", "application/vnd.github+json");
    if let Some(token) = token {
        request = request.set("Authorization", &format!("token {token}"));
    }

    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => return Err(RemoteError::from_status(url, status)),
        Err(ureq::Error::Transport(transport)) => {
            return Err(RemoteError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            })
        }
    };

    response.into_json::<T>().map_err(|e| RemoteError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Conclusion of the first run recorded for `commit`. The API lists runs
/// newest first.
fn conclusion_for(runs: &RunsResponse, commit: &CommitId) -> CiResult {
    runs.workflow_runs
        .iter()
        .find(|run| run.head_sha == commit.as_str())
        .map(|run| CiResult::from_conclusion(run.conclusion.as_deref()))
        .unwrap_or(CiResult::Pending)
}

#[async_trait]
impl RemoteStateSource for GitHubClient {
    async fn head_commit(&self, cancel: &Cancellation) -> Result<CommitId, RemoteError> {
        let url = self.head_url();
        let body: CommitResponse = self.get_json(url.clone(), cancel).await?;
        let sha = body.sha.trim();
        if sha.is_empty() {
            return Err(RemoteError::Decode {
                url,
                message: "empty sha".to_string(),
            });
        }
        Ok(CommitId::from(sha))
    }

    async fn ci_result(
        &self,
        commit: &CommitId,
        cancel: &Cancellation,
    ) -> Result<CiResult, RemoteError> {
        let runs: RunsResponse = self.get_json(self.runs_url(), cancel).await?;
        let result = conclusion_for(&runs, commit);
        tracing::debug!(
            commit = %commit,
            runs = runs.workflow_runs.len(),
            result = %result,
            "CI lookup",
        );
        Ok(result)
    }

    async fn change_set(
        &self,
        old: &CommitId,
        new: &CommitId,
        cancel: &Cancellation,
    ) -> Result<ChangeSet, RemoteError> {
        if old == new {
            return Ok(ChangeSet::default());
        }
        let body: CompareResponse = self.get_json(self.compare_url(old, new), cancel).await?;
        Ok(body.files.into_iter().map(|f| f.filename).collect())
    }
}
