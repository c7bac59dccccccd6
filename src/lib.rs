//! Retailer News: a topic-filtered article crawler for retail-news sites
//!
//! This crate fetches the front pages of a configured list of news sites,
//! extracts article-like links, keeps the ones matching each site's topics,
//! and suppresses articles already reported by an earlier run.

pub mod article;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod output;
pub mod registry;
pub mod report;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry snapshot is empty, nothing to crawl")]
    EmptyRegistry,

    #[error("Seen-store error: {0}")]
    Store(#[from] dedup::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Site already registered: {0}")]
    DuplicateSite(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, NewsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use article::{Article, Candidate};
pub use config::Config;
pub use crawler::{run_crawl, Orchestrator};
pub use dedup::{Deduplicator, MemorySeenStore, SeenKey, SeenStore};
pub use registry::{SiteConfig, SourceRegistry};
pub use report::{CrawlReport, SiteError, SiteOutcome};
pub use state::PipelineStage;
pub use crate::url::{canonicalize_url, site_host};
