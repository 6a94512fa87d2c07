//! Configuration management for CiteGraph
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<env>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Traversal configuration
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Crossref adapter configuration
    #[serde(default)]
    pub crossref: CrossrefConfig,

    /// OpenCitations adapter configuration
    #[serde(default)]
    pub opencitations: OpenCitationsConfig,

    /// Local shard dataset and output locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Depth bound for traversal
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrossrefConfig {
    /// API base URL
    #[serde(default = "default_crossref_base_url")]
    pub base_url: String,

    /// Contact address sent in the User-Agent for the Crossref polite pool
    pub mailto: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate toward the API
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Page size for journal-works listings
    #[serde(default = "default_page_rows")]
    pub page_rows: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenCitationsConfig {
    /// COCI index API base URL
    #[serde(default = "default_opencitations_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate toward the API
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding `{issn}_{year}.json` shard files
    #[serde(default = "default_shard_dir")]
    pub shard_dir: String,

    /// Directory for persisted traversal output
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Optional journal catalog override file (JSON)
    pub catalog_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

// Default value functions
fn default_max_depth() -> u32 {
    crate::DEFAULT_MAX_DEPTH
}
fn default_workers() -> usize {
    crate::DEFAULT_WORKERS
}
fn default_crossref_base_url() -> String {
    "https://api.crossref.org".to_string()
}
fn default_opencitations_base_url() -> String {
    "https://opencitations.net/index/coci/api/v1".to_string()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_requests_per_second() -> u32 {
    10
}
fn default_page_rows() -> u32 {
    100
}
fn default_shard_dir() -> String {
    "journal_data".to_string()
}
fn default_output_dir() -> String {
    ".".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__CRAWLER__MAX_DEPTH=3
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Crossref request timeout as Duration
    pub fn crossref_timeout(&self) -> Duration {
        Duration::from_secs(self.crossref.timeout_secs)
    }

    /// OpenCitations request timeout as Duration
    pub fn opencitations_timeout(&self) -> Duration {
        Duration::from_secs(self.opencitations.timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            workers: default_workers(),
        }
    }
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            base_url: default_crossref_base_url(),
            mailto: None,
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            requests_per_second: default_requests_per_second(),
            page_rows: default_page_rows(),
        }
    }
}

impl Default for OpenCitationsConfig {
    fn default() -> Self {
        Self {
            base_url: default_opencitations_base_url(),
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            shard_dir: default_shard_dir(),
            output_dir: default_output_dir(),
            catalog_file: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            crossref: CrossrefConfig::default(),
            opencitations: OpenCitationsConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
