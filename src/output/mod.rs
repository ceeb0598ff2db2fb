//! Output module: where a run's entities end up
//!
//! This module handles:
//! - The `Sink` trait the accumulator flushes into
//! - JSON and text renderings of categories and products
//! - Atomic file replacement
//! - Run statistics

mod atomic;
mod json;
pub mod stats;
mod text;
mod traits;

pub use atomic::write_atomic;
pub use json::{read_categories_json, CategoriesJsonSink, ProductsJsonSink};
pub use stats::{print_statistics, RunStatistics};
pub use text::{render_categories, render_products, CategoriesTextSink, ProductsTextSink};
pub use traits::{Sink, SinkError, SinkResult};

use std::path::{Path, PathBuf};

use crate::config::OutputConfig;

pub const CATEGORIES_JSON: &str = "categories.json";
pub const CATEGORIES_TXT: &str = "categories.txt";
pub const PRODUCTS_JSON: &str = "products.json";
pub const PRODUCTS_TXT: &str = "products.txt";

/// Path of one of the sink files inside the output directory
pub fn output_path(config: &OutputConfig, file: &str) -> PathBuf {
    Path::new(&config.directory).join(file)
}

/// The four sinks every run writes
///
/// # Arguments
///
/// * `config` - Output directory and text encoding
/// * `source` - Shop URL named in the text headers
pub fn default_sinks(config: &OutputConfig, source: &str) -> Vec<Box<dyn Sink>> {
    vec![
        Box::new(CategoriesJsonSink::new(output_path(config, CATEGORIES_JSON))),
        Box::new(CategoriesTextSink::new(
            output_path(config, CATEGORIES_TXT),
            source,
            config.text_encoding,
        )),
        Box::new(ProductsJsonSink::new(output_path(config, PRODUCTS_JSON))),
        Box::new(ProductsTextSink::new(
            output_path(config, PRODUCTS_TXT),
            source,
            config.text_encoding,
        )),
    ]
}
