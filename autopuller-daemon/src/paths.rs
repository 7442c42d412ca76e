use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVICE_NAME: &str = "autopuller";
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const UNIT_FILE_MODE: u32 = 0o644;

/// How often the log file size is checked.
pub const LOG_ROTATION_CHECK: Duration = Duration::from_secs(30);

pub fn unit_path(dir: &Path, service_name: &str) -> PathBuf {
    dir.join(format!("{service_name}.service"))
}

pub fn env_sample_path(dir: &Path) -> PathBuf {
    dir.join(autopuller_core::config::ENV_SAMPLE_FILE)
}
