//! Provider error types
//!
//! Operation failures travel as diagnostics inside responses. These errors
//! are the fatal class: a provider that cannot be stopped or closed.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Stop failed: {0}")]
    StopFailed(String),

    #[error("Close failed: {0}")]
    CloseFailed(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
