//! Catalog-Mapper: a polite product catalog mapper
//!
//! This crate discovers the category tree of a single e-commerce site by
//! inference from product pages, harvests the products listed under every
//! leaf category, and writes the results once per entity to JSON and text
//! sinks.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Mapper operations
///
/// Only configuration and sink failures end a run. Fetch failures are
/// handled at the seed, page or leaf that issued them and never reach this
/// type.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
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

    #[error("Invalid category filter: {0}")]
    InvalidFilter(String),
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

/// Result type alias for Catalog-Mapper operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{Accumulator, Category, CategoryTree, Product};
pub use config::{CategoryFilter, Config};
pub use state::{OriginState, RunStatus};
pub use crate::url::{canonical_key, category_id_for, extract_domain, normalize_url, slugify};
