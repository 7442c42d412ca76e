use autopuller_core::{
    cancellation, marker_path, store_for, CancelHandle, Config, MarkerFileStore, Outcome,
    UpdateOrchestrator,
};
use autopuller_deploy::{ComposeDeployer, Notifier};
use autopuller_remote::GitHubClient;

use crate::error::{io_err, DaemonError};
use crate::log_rotation::rotation_task;
use crate::logging::{init_tracing, LogFile};
use crate::scheduler::{RunSummary, Scheduler};

type ProductionOrchestrator =
    UpdateOrchestrator<GitHubClient, MarkerFileStore, ComposeDeployer>;

/// Wire the production collaborators from `config`.
pub fn build_orchestrator(config: &Config) -> Result<ProductionOrchestrator, DaemonError> {
    Ok(UpdateOrchestrator::new(
        GitHubClient::new(config),
        store_for(config),
        ComposeDeployer::new(config)?,
    ))
}

/// Initialise logging, build a runtime and block until the daemon exits.
pub fn start_blocking(config: Config) -> Result<RunSummary, DaemonError> {
    let log_file = init_tracing(config.log_json, config.log_file.as_deref())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, log_file))
}

/// Run the polling loop until a shutdown signal or a deploy failure.
pub async fn run(config: Config, log_file: Option<LogFile>) -> Result<RunSummary, DaemonError> {
    let orchestrator = build_orchestrator(&config)?;
    let mut scheduler = Scheduler::new(orchestrator, config.interval);
    if let Some(notifier) = Notifier::from_config(&config)? {
        scheduler = scheduler.with_notifier(notifier, &config.repo, &config.branch);
    }

    log_config(&config);
    tracing::info!(
        repo = %config.repo,
        branch = %config.branch,
        repo_dir = %config.repo_dir.display(),
        compose_dir = %config.compose_dir.display(),
        interval_secs = config.interval.as_secs(),
        state = %marker_path(&config).display(),
        "autopuller started",
    );

    let (handle, cancel) = cancellation();
    let rotation = log_file.map(|file| tokio::spawn(rotation_task(file, cancel.clone())));
    let signals = tokio::spawn(cancel_on_shutdown_signal(handle));

    let result = scheduler.run(&cancel).await;

    signals.abort();
    if let Some(rotation) = rotation {
        rotation.abort();
    }
    result
}

/// One pass with the production collaborators. Ctrl-c cancels it.
pub async fn check_once(config: &Config) -> Result<Outcome, DaemonError> {
    log_config(config);
    let orchestrator = build_orchestrator(config)?;
    let (handle, cancel) = cancellation();
    let signals = tokio::spawn(cancel_on_shutdown_signal(handle));

    let result = orchestrator.check_for_updates(&cancel).await;
    signals.abort();
    result.map_err(|err| {
        if err.is_deploy_failure() {
            DaemonError::Deploy(err)
        } else {
            DaemonError::Check(err)
        }
    })
}

/// Report what happened while the configuration was loaded.
fn log_config(config: &Config) {
    match &config.env_file {
        Some(path) => tracing::info!(path = %path.display(), "applied env file"),
        None => tracing::debug!("no env file found, using the process environment"),
    }
    for warning in &config.warnings {
        tracing::warn!(%warning, "configuration value replaced by default");
    }
}

async fn cancel_on_shutdown_signal(handle: CancelHandle) {
    match shutdown_signal().await {
        Ok(name) => tracing::info!(signal = name, "shutting down"),
        Err(err) => tracing::error!(error = %err, "signal handler failed, shutting down"),
    }
    handle.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())
        .map_err(|e| DaemonError::Signal(format!("SIGTERM handler: {e}")))?;
    tokio::select! {
        ctrl_c = tokio::signal::ctrl_c() => ctrl_c
            .map(|()| "ctrl-c")
            .map_err(|e| DaemonError::Signal(format!("ctrl-c handler: {e}"))),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map(|()| "ctrl-c")
        .map_err(|e| DaemonError::Signal(format!("ctrl-c handler: {e}")))
}
