//! CiteGraph Common Library
//!
//! Shared code for the CiteGraph crates including:
//! - The canonical citation-graph data model
//! - Error types and handling
//! - Configuration management
//! - The `PaperSource` capability trait (forward/backward lookup seam)
//! - The immutable journal catalog (ISSN lookup tables)

pub mod catalog;
pub mod config;
pub mod errors;
pub mod model;
pub mod source;

// Re-export commonly used types
pub use catalog::JournalCatalog;
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use model::{CitationGraph, Doi, NodeRecord, PaperMeta};
pub use source::{FetchError, FetchResult, ForwardRecord, PaperSource};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default traversal depth bound
pub const DEFAULT_MAX_DEPTH: u32 = 2;

/// Default number of concurrent fetch workers
pub const DEFAULT_WORKERS: usize = 8;
