//! Crawler module: everything that touches the network
//!
//! This module contains the core crawling logic, including:
//! - Page fetching behind the `PageFetcher` trait
//! - Request scheduling and rate limiting
//! - Pure HTML extraction
//! - Category discovery and product harvesting
//! - Overall run coordination

mod coordinator;
mod discoverer;
pub mod extractor;
mod fetcher;
mod harvester;
mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{run_catalog, Coordinator, RunOptions, RunReport};
pub use discoverer::{CategoryDiscoverer, Discovery};
pub use extractor::{
    CategoryHint, CategoryPage, DroppedRecord, Extraction, ProductDetails, ProductStub,
};
pub use fetcher::{build_http_client, Document, FetchError, HttpFetcher, PageFetcher};
pub use harvester::{Harvest, ProductHarvester};
pub use scheduler::Scheduler;
