//! Tracing subscriber setup for binaries.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{QuadError, Result};

/// Installs a global fmt subscriber filtered by `level` (an `EnvFilter`
/// directive such as `"info"` or `"sombra_quads=debug"`).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| QuadError::Configuration(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| QuadError::Configuration("logging already initialized".into()))
}
