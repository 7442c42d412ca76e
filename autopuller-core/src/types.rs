//! Domain types for the update decision.
//!
//! Commit identifiers are opaque: the only comparison ever made between two
//! of them is byte-exact equality.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A commit identifier as reported by the hosting API or read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, for log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(7) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Ordered list of paths that differ between two commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(pub Vec<String>);

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ChangeSet {
    fn from(files: Vec<String>) -> Self {
        Self(files)
    }
}

impl FromIterator<String> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Outcome of the remote CI system for one commit.
///
/// Only [`CiResult::Success`] unlocks a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "conclusion")]
pub enum CiResult {
    Success,
    Failure,
    /// No run recorded for the commit yet, or the run has not concluded.
    Pending,
    /// Any other conclusion reported by the CI system (`cancelled`, `skipped`, …).
    Other(String),
}

impl CiResult {
    /// Map a raw run conclusion onto the enum. `None` means the run is still
    /// in progress.
    pub fn from_conclusion(conclusion: Option<&str>) -> Self {
        match conclusion.map(str::trim) {
            None | Some("") => CiResult::Pending,
            Some(c) if c.eq_ignore_ascii_case("success") => CiResult::Success,
            Some(c) if c.eq_ignore_ascii_case("failure") => CiResult::Failure,
            Some(other) => CiResult::Other(other.to_ascii_lowercase()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CiResult::Success)
    }
}

impl fmt::Display for CiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CiResult::Success => write!(f, "success"),
            CiResult::Failure => write!(f, "failure"),
            CiResult::Pending => write!(f, "pending"),
            CiResult::Other(conclusion) => write!(f, "{conclusion}"),
        }
    }
}
