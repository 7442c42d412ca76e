//! Daemon runtime: the polling scheduler, tracing setup with a rotating log
//! file, and systemd unit installation.

mod error;
pub mod log_rotation;
pub mod logging;
pub mod paths;
mod runtime;
pub mod scheduler;
pub mod systemd;

pub use error::DaemonError;
pub use logging::{init_tracing, LogFile};
pub use runtime::{build_orchestrator, check_once, run, start_blocking};
pub use scheduler::{Policy, RunSummary, Scheduler};
pub use systemd::{generate_unit, install as install_systemd, next_steps};
