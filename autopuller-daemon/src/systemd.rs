use std::path::{Path, PathBuf};

use autopuller_renderer::{write_output, Renderer, UnitContext};

use crate::error::DaemonError;
use crate::paths::unit_path;

/// Render the unit file for `<exe> run` started from `working_dir`.
pub fn generate_unit(
    service_name: &str,
    exe: &Path,
    working_dir: &Path,
    user: &str,
) -> Result<String, DaemonError> {
    let ctx = UnitContext::new(service_name, exe, working_dir, user);
    Ok(Renderer::new()?.render_unit(&ctx)?)
}

/// Write `<dir>/<service_name>.service` with mode 0644.
pub fn install(dir: &Path, service_name: &str, unit: &str) -> Result<PathBuf, DaemonError> {
    let path = unit_path(dir, service_name);
    write_output(&path, unit)?;
    set_unit_permissions(&path)?;
    tracing::info!(path = %path.display(), "systemd unit written");
    Ok(path)
}

/// Commands the operator runs after installing the unit.
pub fn next_steps(service_name: &str) -> Vec<String> {
    vec![
        "systemctl daemon-reload".to_string(),
        format!("systemctl enable {service_name}"),
        format!("systemctl start {service_name}"),
    ]
}

#[cfg(unix)]
fn set_unit_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use crate::error::io_err;
    use crate::paths::UNIT_FILE_MODE;

    fs::set_permissions(path, fs::Permissions::from_mode(UNIT_FILE_MODE))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_unit_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
