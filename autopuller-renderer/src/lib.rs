//! # autopuller-renderer
//!
//! Tera templates for the files autopuller generates: the systemd unit and
//! the `.env.sample` configuration reference.
//!
//! ```rust,no_run
//! use autopuller_renderer::{EnvSampleContext, Renderer};
//!
//! fn sample() -> Result<String, autopuller_renderer::RenderError> {
//!     Renderer::new()?.render_env_sample(&EnvSampleContext::default())
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{EnvSampleContext, MetaCtx, UnitContext};
pub use engine::{write_output, Renderer};
pub use error::RenderError;
