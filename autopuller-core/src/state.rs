//! Local state: the record of which commit is deployed.
//!
//! The record is always a [`MarkerFileStore`], advanced only after a deploy
//! finished. The checkout's branch ref cannot serve as the record because
//! `git pull` moves it before the services are rebuilt. [`BranchRef`] is
//! read once, to seed a marker that does not exist yet.
//!
//! Markers are written with the `.tmp` + rename pattern so a crash mid-write
//! leaves the previous value readable.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{io_err, LocalStateError};
use crate::traits::LocalStateStore;
use crate::types::CommitId;

/// Marker file name inside `<repo>/.git` when `STATE_FILE` is unset.
pub const DEFAULT_MARKER_FILE: &str = "autopuller-deployed";

/// `STATE_FILE`, or `<repo>/.git/autopuller-deployed`.
pub fn marker_path(config: &Config) -> PathBuf {
    config
        .state_file
        .clone()
        .unwrap_or_else(|| config.repo_dir.join(".git").join(DEFAULT_MARKER_FILE))
}

/// The deployed-commit store for `config`, seeded from the tracked branch.
pub fn store_for(config: &Config) -> MarkerFileStore {
    MarkerFileStore::new(marker_path(config))
        .seeded_from(BranchRef::new(config.repo_dir.clone(), config.branch.clone()))
}

// ---------------------------------------------------------------------------
// BranchRef
// ---------------------------------------------------------------------------

/// Read-only view of `<repo>/.git/refs/heads/<branch>`, falling back to
/// `<repo>/.git/packed-refs`.
#[derive(Debug, Clone)]
pub struct BranchRef {
    repo_dir: PathBuf,
    branch: String,
}

impl BranchRef {
    pub fn new(repo_dir: PathBuf, branch: String) -> Self {
        Self { repo_dir, branch }
    }

    /// `<repo>/.git/refs/heads/<branch>`. Pure, no I/O.
    pub fn ref_path(&self) -> PathBuf {
        self.repo_dir
            .join(".git")
            .join("refs")
            .join("heads")
            .join(&self.branch)
    }

    pub fn read(&self) -> Result<CommitId, LocalStateError> {
        let path = self.ref_path();
        match fs::read_to_string(&path) {
            Ok(contents) => parse_commit(&path, &contents),
            Err(err) if err.kind() == ErrorKind::NotFound => self.read_packed(),
            Err(err) => Err(io_err(&path, err)),
        }
    }

    fn packed_refs_path(&self) -> PathBuf {
        self.repo_dir.join(".git").join("packed-refs")
    }

    fn read_packed(&self) -> Result<CommitId, LocalStateError> {
        let packed = self.packed_refs_path();
        let contents = match fs::read_to_string(&packed) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(LocalStateError::NotFound {
                    path: self.ref_path(),
                })
            }
            Err(err) => return Err(io_err(&packed, err)),
        };

        let wanted = format!("refs/heads/{}", self.branch);
        contents
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
            .filter_map(|line| line.split_once(' '))
            .find(|(_, name)| name.trim() == wanted)
            .map(|(sha, _)| CommitId::from(sha.trim()))
            .ok_or(LocalStateError::NotFound {
                path: self.ref_path(),
            })
    }
}

// ---------------------------------------------------------------------------
// MarkerFileStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MarkerFileStore {
    path: PathBuf,
    seed: Option<BranchRef>,
}

impl MarkerFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, seed: None }
    }

    /// On first read with no marker, record what `seed` points at.
    pub fn seeded_from(mut self, seed: BranchRef) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.tmp", self.path.display()))
    }

    fn write(&self, commit: &CommitId) -> Result<(), LocalStateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, format!("{commit}\n")).map_err(|e| io_err(&tmp, e))?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&self.path, err));
        }
        Ok(())
    }

    fn seed_marker(&self) -> Result<CommitId, LocalStateError> {
        let Some(seed) = &self.seed else {
            return Err(LocalStateError::NotFound {
                path: self.path.clone(),
            });
        };
        let commit = seed.read()?;
        self.write(&commit)?;
        tracing::info!(
            commit = %commit,
            path = %self.path.display(),
            from = %seed.ref_path().display(),
            "no deployed commit recorded, seeded from branch ref",
        );
        Ok(commit)
    }
}

impl LocalStateStore for MarkerFileStore {
    fn current(&self) -> Result<CommitId, LocalStateError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_commit(&self.path, &contents),
            Err(err) if err.kind() == ErrorKind::NotFound => self.seed_marker(),
            Err(err) => Err(io_err(&self.path, err)),
        }
    }

    fn set_current(&self, commit: &CommitId) -> Result<(), LocalStateError> {
        self.write(commit)?;
        tracing::debug!(commit = %commit, path = %self.path.display(), "recorded deployed commit");
        Ok(())
    }
}

fn parse_commit(path: &Path, contents: &str) -> Result<CommitId, LocalStateError> {
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Err(LocalStateError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(CommitId::from(trimmed))
}
