//! Configuration module for Catalog-Mapper
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and the command-line category filter.
//!
//! # Example
//!
//! ```no_run
//! use catalog_mapper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Mapping {}", config.site.base_url);
//! ```

mod filter;
mod parser;
mod types;
mod validation;

// Re-export types
pub use filter::CategoryFilter;
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig, TextEncoding, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
