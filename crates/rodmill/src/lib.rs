mod config;
mod error;
mod grip;
mod hollow;
mod postprocessor;
mod taper;
mod taper_profile;
mod toolpath_generation;
mod types;

pub use config::*;
pub use error::{ConfigError, MillError, Result};
pub use grip::*;
pub use hollow::*;
pub use postprocessor::{post_process_linuxcnc, MotionEmitter, Program};
pub use taper::*;
pub use taper_profile::*;
pub use toolpath_generation::*;
pub use types::*;

/// Install the stderr `tracing` subscriber.
///
/// Standard output carries only the G-code stream, so log records go to
/// stderr. `RUST_LOG` narrows or widens the default `info` level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env()?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
