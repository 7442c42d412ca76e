//! Tracing setup: human-readable or JSON lines on stdout, optionally teed
//! into a rotating log file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{io_err, DaemonError};
use crate::log_rotation;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// Returns the opened log file so the caller can drive rotation. A
/// subscriber that is already installed is left in place.
pub fn init_tracing(json: bool, log_file: Option<&Path>) -> Result<Option<LogFile>, DaemonError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let file = log_file.map(LogFile::open).transpose()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);

    let _ = match (json, file.clone()) {
        (true, Some(f)) => builder
            .json()
            .with_writer(io::stdout.and(f))
            .try_init(),
        (true, None) => builder.json().try_init(),
        (false, Some(f)) => builder
            .with_ansi(false)
            .with_writer(io::stdout.and(f))
            .try_init(),
        (false, None) => builder.try_init(),
    };
    Ok(file)
}

// ---------------------------------------------------------------------------
// LogFile
// ---------------------------------------------------------------------------

struct Inner {
    path: PathBuf,
    file: File,
}

/// Append-only log file shared between the subscriber and the rotation
/// task. Rotation swaps the handle under the same lock writers take.
#[derive(Clone)]
pub struct LogFile {
    inner: Arc<Mutex<Inner>>,
}

impl LogFile {
    pub fn open(path: &Path) -> Result<Self, DaemonError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let file = open_append(path).map_err(|e| io_err(path, e))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                path: path.to_path_buf(),
                file,
            })),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Rotate when over `max_bytes` and reopen a fresh live file.
    pub fn rotate_if_needed(&self, max_bytes: u64, max_files: usize) -> io::Result<bool> {
        let mut inner = self.lock();
        inner.file.flush()?;
        if !log_rotation::rotate_if_needed(&inner.path, max_bytes, max_files)? {
            return Ok(false);
        }
        inner.file = open_append(&inner.path)?;
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub struct LogFileWriter<'a> {
    guard: MutexGuard<'a, Inner>,
}

impl Write for LogFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.file.flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter { guard: self.lock() }
    }
}
