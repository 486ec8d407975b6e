//! Value and schema error types

use crate::path::Path;
use thiserror::Error;

/// Errors raised while checking, converting or decoding values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{path}: {message}")]
    TypeMismatch { path: Path, message: String },

    #[error("{path}: unsupported attribute {name:?}")]
    UnsupportedAttribute { path: Path, name: String },

    #[error("{path}: {message}")]
    InvalidPath { path: Path, message: String },

    #[error("flatmap key {key:?}: {message}")]
    Flatmap { key: String, message: String },

    #[error("JSON state: {0}")]
    Json(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("wire encoding: {0}")]
    Wire(String),
}

impl CoreError {
    pub fn type_mismatch(path: &Path, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub fn invalid_path(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// The attribute path the error points at, when there is one
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::UnsupportedAttribute { path, .. }
            | Self::InvalidPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
