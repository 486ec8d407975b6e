//! Engine error types
//!
//! Per-instance failures are diagnostics in the run report. These cover the
//! rest: bad engine configuration, a provider that cannot be closed, and
//! logging setup.

use stratum_config::ConfigError;
use stratum_provider::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
