//! Error types for CiteGraph
//!
//! Two layers of failure are kept deliberately separate:
//! - [`AppError`] covers failures that abort an operation (bad input,
//!   corrupt persisted state, configuration problems)
//! - [`crate::source::FetchError`] covers per-identifier provider failures,
//!   which the traversal engine absorbs into degraded node records instead
//!   of propagating

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller supplied an unusable parameter (empty root DOI, bad ISSN, ...)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A persisted graph failed to parse into the expected shape.
    /// Loads are all-or-nothing: no partial graph escapes this error.
    #[error("Corrupt graph data in {path}: {message}")]
    CorruptData { path: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for input-validation failures
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for corrupt persisted state
    pub fn corrupt_data(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::CorruptData {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
