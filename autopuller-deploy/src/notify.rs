//! Deploy notifications through an external mail command.
//!
//! Invocation is `<SENDMAIL_CMD...> <subject> <NOTIFY_TO>` with the message
//! body on stdin, which fits `mail -s`, `mailx -s` and similar tools.

use std::path::PathBuf;

use autopuller_core::{Cancellation, ChangeSet, CommandError, CommitId, Config, OrchestrationError};

use crate::runner::{run, split_line, CommandSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn deployed(repo: &str, branch: &str, from: &CommitId, to: &CommitId, changes: &ChangeSet) -> Self {
        let mut body = format!(
            "Deployed {repo} ({branch}) at {}\n\nfrom: {from}\nto:   {to}\n\nChanged files ({}):\n",
            chrono::Utc::now().to_rfc3339(),
            changes.len(),
        );
        for file in changes.iter() {
            body.push_str("  ");
            body.push_str(file);
            body.push('\n');
        }
        Self {
            subject: format!("[autopuller] {repo} deployed {}", to.short()),
            body,
        }
    }

    pub fn failed(repo: &str, branch: &str, err: &OrchestrationError) -> Self {
        let mut body = format!(
            "Deploy of {repo} ({branch}) failed at {}\n\n{err}\n",
            chrono::Utc::now().to_rfc3339(),
        );
        let command_error = match err {
            OrchestrationError::Pull(e) | OrchestrationError::Restart(e) => Some(e),
            _ => None,
        };
        if let Some(CommandError::Failed { output, .. }) = command_error {
            body.push_str("\nOutput:\n");
            body.push_str(output);
            body.push('\n');
        }
        Self {
            subject: format!("[autopuller] {repo} deploy FAILED"),
            body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    command: Vec<String>,
    recipient: String,
    cwd: PathBuf,
}

impl Notifier {
    /// `None` unless both `SENDMAIL_CMD` and `NOTIFY_TO` are configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, CommandError> {
        let Some(notify) = &config.notify else {
            return Ok(None);
        };
        Ok(Some(Self {
            command: split_line(&notify.command)?,
            recipient: notify.recipient.clone(),
            cwd: config.repo_dir.clone(),
        }))
    }

    pub fn command_for(&self, message: &Message) -> CommandSpec {
        let (program, base) = match self.command.split_first() {
            Some((program, base)) => (program.as_str(), base),
            None => ("mail", &[][..]),
        };
        CommandSpec::new(program, &self.cwd)
            .args(base.iter().cloned())
            .arg(message.subject.clone())
            .arg(self.recipient.clone())
            .stdin(message.body.clone())
    }

    pub async fn send(&self, message: &Message, cancel: &Cancellation) -> Result<(), CommandError> {
        run(&self.command_for(message), cancel).await.map(|_| ())
    }

    /// Send and log the result. Never fails.
    pub async fn notify(&self, message: &Message, cancel: &Cancellation) {
        match self.send(message, cancel).await {
            Ok(()) => tracing::info!(to = %self.recipient, subject = %message.subject, "notification sent"),
            Err(err) => tracing::warn!(to = %self.recipient, error = %err, "notification failed"),
        }
    }
}
