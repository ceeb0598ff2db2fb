//! JSON sinks: `categories.json` and `products.json`

use std::fs;
use std::path::{Path, PathBuf};

use super::atomic::write_atomic;
use super::traits::{Sink, SinkResult};
use crate::catalog::{Category, Snapshot};

/// Writes root categories, subcategories nested, as a pretty JSON array
pub struct CategoriesJsonSink {
    path: PathBuf,
    name: String,
}

impl CategoriesJsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
        }
    }
}

impl Sink for CategoriesJsonSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, snapshot: &Snapshot) -> SinkResult<()> {
        let mut json = serde_json::to_string_pretty(&snapshot.categories)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())
    }
}

/// Writes products as a pretty JSON array, absent fields as `null`
pub struct ProductsJsonSink {
    path: PathBuf,
    name: String,
}

impl ProductsJsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
        }
    }
}

impl Sink for ProductsJsonSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, snapshot: &Snapshot) -> SinkResult<()> {
        let mut json = serde_json::to_string_pretty(&snapshot.products)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())
    }
}

/// Reads a `categories.json` written by a previous run
pub fn read_categories_json(path: &Path) -> SinkResult<Vec<Category>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub(super) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategoryTree, Product};
    use chrono::Utc;
    use tempfile::TempDir;

    fn snapshot() -> Snapshot {
        let mut shoes =
            Category::new("shoes", "Shoes", "https://shop.example/product-category/shoes/");
        shoes.subcategories.push(Category::new(
            "running",
            "Running",
            "https://shop.example/product-category/shoes/running/",
        ));
        let bags = Category::new("bags", "Bags", "https://shop.example/product-category/bags/");

        Snapshot {
            started_at: Utc::now(),
            categories: vec![shoes, bags],
            products: vec![Product {
                name: "Trail Runner".to_string(),
                url: "https://shop.example/product/trail-runner/".to_string(),
                category: "Shoes".to_string(),
                subcategory: Some("Running".to_string()),
                image_url: None,
                price: Some("QAR 199.00".to_string()),
                sku: None,
                brand: None,
                description: None,
                stock_status: Some("In stock".to_string()),
                extracted_at: Utc::now(),
            }],
        }
    }

    #[test]
    fn test_categories_round_trip_same_leaves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.json");
        let snapshot = snapshot();

        CategoriesJsonSink::new(&path).write(&snapshot).unwrap();
        let read = read_categories_json(&path).unwrap();

        assert_eq!(read, snapshot.categories);
        assert_eq!(
            CategoryTree::from_categories(read).leaves(),
            CategoryTree::from_categories(snapshot.categories).leaves()
        );
    }

    #[test]
    fn test_products_json_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("products.json");

        let mut sink = ProductsJsonSink::new(&path);
        assert_eq!(sink.name(), "products.json");
        sink.write(&snapshot()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert!(value[0]["sku"].is_null());
        assert_eq!(value[0]["subcategory"], "Running");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(read_categories_json(&dir.path().join("nope.json")).is_err());
    }
}
