//! Paper-source abstraction
//!
//! Provides a unified interface over asymmetric citation data sources:
//! - forward lookup: a work's metadata plus the DOIs it references
//! - backward lookup: the DOIs of works citing it
//!
//! Adapters may be backed by live network services (Crossref,
//! OpenCitations) or by a local sharded dataset. The traversal engine only
//! ever sees this trait.

use crate::errors::AppError;
use crate::model::{Doi, PaperMeta};
use async_trait::async_trait;
use thiserror::Error;

/// Per-identifier fetch failure.
///
/// The traversal engine recovers from both variants identically, by storing
/// a degraded record; the distinction exists for adapters and logging.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The identifier is absent from the data source
    #[error("not found: {doi}")]
    NotFound { doi: Doi },

    /// Network failure, timeout, non-success status, or malformed payload
    #[error("provider unavailable for {doi}: {message}")]
    Unavailable { doi: Doi, message: String },
}

impl FetchError {
    pub fn unavailable(doi: &Doi, message: impl Into<String>) -> Self {
        FetchError::Unavailable {
            doi: doi.clone(),
            message: message.into(),
        }
    }

    pub fn not_found(doi: &Doi) -> Self {
        FetchError::NotFound { doi: doi.clone() }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

/// Result type alias for provider fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Successful forward lookup: metadata plus outgoing references
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRecord {
    pub meta: PaperMeta,

    /// DOIs referenced by the work, in provider order
    pub references: Vec<Doi>,
}

/// Trait for citation data sources
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Fetch a work's bibliographic metadata and the DOIs it references
    async fn fetch_forward(&self, doi: &Doi) -> FetchResult<ForwardRecord>;

    /// Fetch the DOIs of works that cite this one
    async fn fetch_backward(&self, doi: &Doi) -> FetchResult<Vec<Doi>>;

    /// Human-readable source name for logging
    fn name(&self) -> &str;
}
