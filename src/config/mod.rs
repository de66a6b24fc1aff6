//! Configuration module for Blog Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use blog_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.site.base_url, config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, DelayRange, ExtractorConfig, FetchProfile, FetchSettings,
    FetcherConfig, OutputConfig, SiteConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
