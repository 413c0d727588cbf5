//! Site Mapper: bounded site-map crawler
//!
//! This crate crawls a single web domain into a bounded graph of pages and
//! links, and runs many such crawls concurrently from a durable work queue.
//! It respects robots.txt, folds `www`/non-`www` duplicates together, and
//! checkpoints progress while a crawl is running.

pub mod config;
pub mod crawler;
pub mod domain;
pub mod engine;
pub mod output;
pub mod robots;
pub mod site;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for site mapper operations
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("Invalid domain: '{0}'")]
    InvalidDomain(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

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
}

/// Errors that end a site crawl
///
/// Per-page failures never surface here; they are recorded on the page.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid domain: '{0}'")]
    InvalidDomain(String),

    #[error("Final save of {domain} failed: {source}")]
    FinalSave {
        domain: String,
        source: storage::StorageError,
    },
}

/// Result type alias for site mapper operations
pub type Result<T> = std::result::Result<T, MapperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::SiteCrawler;
pub use domain::{is_valid_domain, normalize_domain};
pub use engine::{MappingClient, MappingEngine};
pub use site::{Page, Site, SiteContents, SiteInfo};
pub use state::{PageStatus, SiteStatus};
pub use storage::{SiteRepository, SqliteSiteRepository};
