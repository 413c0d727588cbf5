//! Configuration module for the site mapper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every option has a default, so `Config::default()` is a complete configuration.
//!
//! # Example
//!
//! ```no_run
//! use site_mapper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-mapper.toml")).unwrap();
//! println!("Page budget: {}", config.crawler.desired_number_of_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClientConfig, Config, CrawlerConfig, EngineConfig, StorageConfig, UserAgentConfig,
    MAX_DESIRED_PAGES, MAX_INTERRUPTED_RETRY_HOURS, MAX_PROBLEM_RETRY_MINUTES,
    MAX_REFRESH_PERIOD_DAYS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
