//! `autopuller config`: the settings the daemon would run with.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use autopuller_core::{marker_path, Config};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled, Serialize)]
struct ConfigRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config()?;
        let rows = config_rows(&config);

        if self.json {
            let map: serde_json::Map<String, serde_json::Value> = rows
                .into_iter()
                .map(|row| (row.key.to_string(), serde_json::Value::String(row.value)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
            return Ok(());
        }

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn config_rows(config: &Config) -> Vec<ConfigRow> {
    let row = |key, value: String| ConfigRow { key, value };
    let unset = || "(unset)".to_string();

    vec![
        row("REPONAME", config.repo.clone()),
        row("GITHUBKEY", mask(config.token.as_deref())),
        row("GITHUB_URL_PREFIX", config.api_prefix.clone()),
        row("BRANCH", config.branch.clone()),
        row("REPODIR", config.repo_dir.display().to_string()),
        row("DOCKERDIR", config.compose_dir.display().to_string()),
        row("DOCKERCOMMAND", config.compose_command.clone()),
        row("FORCEPULL", config.force_pull.to_string()),
        row("INTERVAL", format!("{}s", config.interval.as_secs())),
        row("STATE_FILE", marker_path(config).display().to_string()),
        row("HTTP_TIMEOUT", format!("{}s", config.http_timeout.as_secs())),
        row(
            "SENDMAIL_CMD",
            config
                .notify
                .as_ref()
                .map(|n| n.command.clone())
                .unwrap_or_else(unset),
        ),
        row(
            "NOTIFY_TO",
            config
                .notify
                .as_ref()
                .map(|n| n.recipient.clone())
                .unwrap_or_else(unset),
        ),
        row("LINTING_COMMIT_MSG", config.linting_commit_msg.clone()),
        row(
            "LOG_FILE",
            config
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(unset),
        ),
        row(
            "LOG_FORMAT",
            if config.log_json { "json" } else { "text" }.to_string(),
        ),
    ]
}

/// Keep the last four characters of a token.
fn mask(token: Option<&str>) -> String {
    match token {
        None => "(unset)".to_string(),
        Some(t) if t.chars().count() <= 4 => "****".to_string(),
        Some(t) => {
            let tail: String = t.chars().skip(t.chars().count() - 4).collect();
            format!("****{tail}")
        }
    }
}
