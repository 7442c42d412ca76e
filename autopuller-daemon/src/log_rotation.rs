//! Size-based rotation for the optional `LOG_FILE`.
//!
//! `autopuller.log` → `autopuller.log.1` → … → `autopuller.log.<max_files>`;
//! the oldest copy falls off the end.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use autopuller_core::Cancellation;

use crate::logging::LogFile;
use crate::paths::LOG_ROTATION_CHECK;

/// Rotate once the live file reaches 10 MiB.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated copies kept next to the live file.
pub const MAX_ROTATED_FILES: usize = 5;

/// Shift backups up by one and move `log_path` to `<name>.1`.
///
/// Returns `false` without touching anything when the file is missing or
/// below `max_bytes`. The caller reopens the live file.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    match fs::metadata(log_path) {
        Ok(meta) if meta.len() >= max_bytes => {}
        Ok(_) => return Ok(false),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    }

    remove_if_present(&numbered_path(log_path, max_files))?;
    for n in (1..max_files).rev() {
        rename_if_present(&numbered_path(log_path, n), &numbered_path(log_path, n + 1))?;
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    Ok(true)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn rename_if_present(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

pub fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "autopuller.log".to_string());
    base.with_file_name(format!("{name}.{n}"))
}

/// Periodically rotate `log_file` until `cancel` fires.
pub async fn rotation_task(log_file: LogFile, cancel: Cancellation) {
    let mut interval = tokio::time::interval(LOG_ROTATION_CHECK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let file = log_file.clone();
                let rotated = tokio::task::spawn_blocking(move || {
                    file.rotate_if_needed(MAX_LOG_BYTES, MAX_ROTATED_FILES)
                })
                .await;
                match rotated {
                    Ok(Ok(true)) => tracing::info!(path = %log_file.path().display(), "log file rotated"),
                    Ok(Ok(false)) => {}
                    Ok(Err(err)) => tracing::warn!(path = %log_file.path().display(), error = %err, "log rotation failed"),
                    Err(err) => tracing::warn!(error = %err, "log rotation task panicked"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, len: usize, byte: u8) {
        fs::write(path, vec![byte; len]).unwrap();
    }

    #[test]
    fn small_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("autopuller.log");
        write_bytes(&log, 100, b'a');
        assert!(!rotate_if_needed(&log, 1024, 3).unwrap());
        assert!(!numbered_path(&log, 1).exists());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!rotate_if_needed(&dir.path().join("nope.log"), 1024, 3).unwrap());
    }

    #[test]
    fn oversized_file_moves_to_first_backup() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("autopuller.log");
        write_bytes(&log, 2048, b'a');

        assert!(rotate_if_needed(&log, 1024, 3).unwrap());
        assert!(!log.exists(), "caller reopens the live file");
        assert_eq!(fs::metadata(numbered_path(&log, 1)).unwrap().len(), 2048);
    }

    #[test]
    fn backups_shift_and_oldest_is_dropped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("autopuller.log");

        for round in 0..4u8 {
            write_bytes(&log, 2048, b'a' + round);
            rotate_if_needed(&log, 1024, 3).unwrap();
        }

        // Four rotations into three slots: newest is 'd', oldest kept is 'b'.
        assert_eq!(fs::read(numbered_path(&log, 1)).unwrap()[0], b'd');
        assert_eq!(fs::read(numbered_path(&log, 2)).unwrap()[0], b'c');
        assert_eq!(fs::read(numbered_path(&log, 3)).unwrap()[0], b'b');
        assert!(!numbered_path(&log, 4).exists());
    }
}
