//! Logging setup

use crate::error::{EngineError, Result};
use stratum_config::EngineConfig;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// config's `log_filter`.
///
/// Returns `false` when a global subscriber was already installed, so tests
/// may call this freely.
pub fn init_logging(config: &EngineConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .map_err(|e| EngineError::Logging(format!("{}: {}", config.log_filter, e)))?,
    };
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok())
}
