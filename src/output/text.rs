//! Human-readable sinks: `categories.txt` and `products.txt`
//!
//! Both files share a layout: a header naming the source and the time of
//! the run, one block per entity separated by dashed rules, and a footer
//! with the total. Absent fields print as `N/A`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::atomic::write_atomic;
use super::json::file_name;
use super::traits::{Sink, SinkResult};
use crate::catalog::{Category, Product, Snapshot};
use crate::config::TextEncoding;

const HEAVY_RULE: usize = 50;
const BANNER_RULE: usize = 60;
const BLOCK_RULE: usize = 40;
const ABSENT: &str = "N/A";

/// Writes `categories.txt`
pub struct CategoriesTextSink {
    path: PathBuf,
    name: String,
    source: String,
    encoding: TextEncoding,
}

impl CategoriesTextSink {
    pub fn new(path: impl Into<PathBuf>, source: &str, encoding: TextEncoding) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            source: source.to_string(),
            encoding,
        }
    }
}

impl Sink for CategoriesTextSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, snapshot: &Snapshot) -> SinkResult<()> {
        let text = render_categories(snapshot, &self.source, self.encoding, Utc::now());
        write_atomic(&self.path, encode(&text, self.encoding).as_bytes())
    }
}

/// Writes `products.txt`
pub struct ProductsTextSink {
    path: PathBuf,
    name: String,
    source: String,
    encoding: TextEncoding,
}

impl ProductsTextSink {
    pub fn new(path: impl Into<PathBuf>, source: &str, encoding: TextEncoding) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            source: source.to_string(),
            encoding,
        }
    }
}

impl Sink for ProductsTextSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, snapshot: &Snapshot) -> SinkResult<()> {
        let text = render_products(snapshot, &self.source, self.encoding, Utc::now());
        write_atomic(&self.path, encode(&text, self.encoding).as_bytes())
    }
}

/// Renders `categories.txt`
pub fn render_categories(
    snapshot: &Snapshot,
    source: &str,
    encoding: TextEncoding,
    finished_at: DateTime<Utc>,
) -> String {
    let mut out = header("Catalog Categories", snapshot.started_at, source, encoding);

    for category in &snapshot.categories {
        out.push_str(&format!("Category: {}\n", category.name));
        out.push_str(&format!("Category ID: {}\n", category.category_id));
        out.push_str(&format!("URL: {}\n", category.url));
        out.push_str(&format!("Description: {}\n", or_absent(&category.description)));
        out.push_str(&format!("Image URL: {}\n", or_absent(&category.image_url)));
        out.push_str(&format!(
            "Products Count: {}\n",
            category
                .products_count
                .map_or_else(|| ABSENT.to_string(), |n| n.to_string())
        ));

        if !category.subcategories.is_empty() {
            out.push_str("Subcategories:\n");
            push_subcategories(&mut out, &category.subcategories, 1);
        }

        out.push_str(&"-".repeat(BLOCK_RULE));
        out.push_str("\n\n");
    }

    out.push_str(&footer("Categories", snapshot.categories.len(), finished_at));
    out
}

/// Renders `products.txt`
///
/// A category banner precedes each run of products sharing a category and
/// sub-category.
pub fn render_products(
    snapshot: &Snapshot,
    source: &str,
    encoding: TextEncoding,
    finished_at: DateTime<Utc>,
) -> String {
    let mut out = header("Catalog Products", snapshot.started_at, source, encoding);
    let mut current: Option<(&str, Option<&str>)> = None;

    for product in &snapshot.products {
        let group = (product.category.as_str(), product.subcategory.as_deref());
        if current != Some(group) {
            out.push_str(&format!("\n{}\n", "=".repeat(BANNER_RULE)));
            out.push_str(&format!("Category: {}\n", product.category));
            let subcategory = product.subcategory.as_deref().unwrap_or(ABSENT);
            out.push_str(&format!("Sub-category: {}\n", subcategory));
            out.push_str(&format!("{}\n\n", "=".repeat(BANNER_RULE)));
            current = Some(group);
        }
        push_product(&mut out, product);
    }

    out.push_str(&footer("Products", snapshot.products.len(), finished_at));
    out
}

fn push_subcategories(out: &mut String, subcategories: &[Category], depth: usize) {
    for sub in subcategories {
        out.push_str(&format!("{}- {} (URL: {})\n", "  ".repeat(depth), sub.name, sub.url));
        push_subcategories(out, &sub.subcategories, depth + 1);
    }
}

fn push_product(out: &mut String, product: &Product) {
    out.push_str(&format!("Product Name: {}\n", product.name));
    out.push_str(&format!("SKU: {}\n", or_absent(&product.sku)));
    out.push_str(&format!("Brand: {}\n", or_absent(&product.brand)));
    out.push_str(&format!("Price: {}\n", or_absent(&product.price)));
    out.push_str(&format!("Description: {}\n", or_absent(&product.description)));
    out.push_str(&format!("Stock Status: {}\n", or_absent(&product.stock_status)));
    out.push_str(&format!("Product URL: {}\n", product.url));
    out.push_str(&format!("Image URL: {}\n", or_absent(&product.image_url)));
    out.push_str(&"-".repeat(BLOCK_RULE));
    out.push_str("\n\n");
}

fn header(title: &str, started_at: DateTime<Utc>, source: &str, encoding: TextEncoding) -> String {
    format!(
        "{}\n{}\n\nScraped on: {}\nSource: {}\nEncoding: {}\n\n",
        title,
        "=".repeat(HEAVY_RULE),
        started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        source,
        encoding.label()
    )
}

fn footer(entity: &str, total: usize, finished_at: DateTime<Utc>) -> String {
    format!(
        "\n{}\nTotal {} Extracted: {}\nScraping completed at: {}\n",
        "=".repeat(HEAVY_RULE),
        entity,
        total,
        finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn or_absent(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(ABSENT)
}

/// Applies the configured character set; ASCII replaces anything else with `?`
fn encode(text: &str, encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 => text.to_string(),
        TextEncoding::Ascii => text.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect(),
    }
}
