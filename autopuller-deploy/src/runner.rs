//! Cancellable subprocess execution.
//!
//! Every command runs with an explicit working directory, captured stdout and
//! stderr, and `kill_on_drop` so that abandoning the wait (cancellation)
//! kills the child.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use autopuller_core::{Cancellation, CommandError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A program, its arguments, where to run it and what to feed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Shell-quoted command line, for logs and error messages.
    pub fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }
}

/// Split a configured command line, rejecting unbalanced quotes and blanks.
pub fn split_line(line: &str) -> Result<Vec<String>, CommandError> {
    let parts = shell_words::split(line).map_err(|e| CommandError::Parse {
        line: line.to_string(),
        message: e.to_string(),
    })?;
    if parts.is_empty() {
        return Err(CommandError::Parse {
            line: line.to_string(),
            message: "empty command".to_string(),
        });
    }
    Ok(parts)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    /// stdout followed by stderr, lossily decoded and right-trimmed.
    pub output: String,
}

/// Run `spec` to completion, or until `cancel` fires.
///
/// A non-zero exit is [`CommandError::Failed`] carrying the combined output.
pub async fn run(spec: &CommandSpec, cancel: &Cancellation) -> Result<CommandOutput, CommandError> {
    let command = spec.display();
    if cancel.is_cancelled() {
        return Err(CommandError::Cancelled { command });
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(command = %command, cwd = %spec.cwd.display(), "spawning");
    let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
        command: command.clone(),
        source,
    })?;

    if let (Some(input), Some(mut pipe)) = (spec.stdin.as_deref(), child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .map_err(|source| CommandError::Io {
                command: command.clone(),
                source,
            })?;
    }

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!(command = %command, "cancelled, killing child");
            return Err(CommandError::Cancelled { command });
        }
        waited = child.wait_with_output() => waited.map_err(|source| CommandError::Io {
            command: command.clone(),
            source,
        })?,
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let combined = combined.trim_end().to_string();

    if !output.status.success() {
        return Err(CommandError::Failed {
            command,
            status: output.status.to_string(),
            code: output.status.code(),
            output: combined,
        });
    }

    Ok(CommandOutput {
        code: output.status.code(),
        output: combined,
    })
}
