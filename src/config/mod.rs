//! Configuration module for Catalog-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling {} for {} items", config.site.host, config.crawl.max_items);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FetchConfig, OutputConfig, OutputFormat, SiteConfig, StartUrl,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ITEMS, DEFAULT_SEARCH_TERM, DEFAULT_USER_AGENT,
    PAGES_PER_ITEM,
};
pub use validation::{validate, MAX_CONCURRENCY};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
