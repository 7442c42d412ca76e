//! Tera engine over the embedded templates.
//!
//! | Template                 | Output                         |
//! |--------------------------|--------------------------------|
//! | `systemd.service.tera`   | `<name>.service`               |
//! | `env.sample.tera`        | `.env.sample`                  |

use std::fs;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::{EnvSampleContext, UnitContext};
use crate::error::RenderError;

pub const UNIT_TEMPLATE: &str = "systemd.service.tera";
pub const ENV_SAMPLE_TEMPLATE: &str = "env.sample.tera";

// Baked in at compile time.
const TPLS: &[(&str, &str)] = &[
    (UNIT_TEMPLATE, include_str!("templates/systemd.service.tera")),
    (ENV_SAMPLE_TEMPLATE, include_str!("templates/env.sample.tera")),
];

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TPLS.iter().copied())?;
        Ok(Self { tera })
    }

    pub fn render_unit(&self, ctx: &UnitContext) -> Result<String, RenderError> {
        Ok(self.tera.render(UNIT_TEMPLATE, &ctx.to_tera_context()?)?)
    }

    pub fn render_env_sample(&self, ctx: &EnvSampleContext) -> Result<String, RenderError> {
        Ok(self.tera.render(ENV_SAMPLE_TEMPLATE, &ctx.to_tera_context()?)?)
    }
}

/// Write `contents` to `path` via a `.tmp` sibling and rename, creating the
/// parent directory if needed.
pub fn write_output(path: &Path, contents: &str) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(path, e)
    })
}
