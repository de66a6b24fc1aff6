//! Blog Harvester: a polite, bounded-concurrency blog crawler
//!
//! This crate discovers, fetches, parses, deduplicates and persists blog posts
//! from a paginated/archived blog. Posts land in a single JSON corpus snapshot
//! that downstream tools query through [`storage::PostStore`].

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod text;
pub mod url;

use thiserror::Error;

/// Main error type for Blog Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    /// The crawl ran but its final snapshot could not be written
    #[error("Final snapshot failed after {summary}: {source}")]
    FinalFlush {
        summary: crawler::CrawlSummary,
        source: storage::StorageError,
    },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Blog Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlSummary, StopReason};
pub use state::{CrawlTarget, TargetRole, UrlState};
pub use storage::{JsonCorpusStore, Post, PostDraft, PostPage, PostStore};
pub use url::{is_same_origin, normalize_url};
