//! Naver Finance Crawler: a batch crawl orchestration engine
//!
//! This crate drives a single headless browser session through a fixed universe
//! of stock symbols, extracts investment indicators from Naver Finance pages,
//! normalizes them into a category-specific tabular schema, and exports the
//! result as a partitioned CSV object.
//!
//! The main pieces are:
//! - [`config`]: layered resolution of the per-invocation [`CrawlRequest`]
//! - [`crawler`]: the dispatcher, session manager and retry/pace controller
//! - [`adapters`]: page-specific extraction for each data category
//! - [`transform`]: raw record to canonical record mapping
//! - [`export`]: CSV serialization and partition keys
//! - [`storage`]: object storage backends (S3 and local filesystem)

pub mod adapters;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod export;
pub mod report;
pub mod storage;
pub mod symbols;
pub mod transform;

use thiserror::Error;

/// Fatal error type for a crawl run
///
/// Per-symbol extraction and transformation failures never surface here; they
/// are recorded in the run result instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Failed to launch browser session: {0}")]
    SessionLaunch(#[source] browser::BrowserError),

    #[error("Export to {path} failed: {source}")]
    Export {
        path: String,
        #[source]
        source: storage::StorageError,
        tally: report::CrawlTally,
    },

    #[error("Run cancelled after {processed} of {total} symbols")]
    Cancelled { processed: usize, total: usize },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Unsupported crawler type '{0}' (supported: daily, quarter, annual)")]
    UnknownCategory(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for crawl runs
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Category, CrawlRequest};
pub use crawler::Dispatcher;
pub use report::{InvocationResponse, RunResult};
pub use symbols::{Symbol, SymbolUniverse};
