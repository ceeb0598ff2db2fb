//! Run-scoped deduplication and accumulation
//!
//! The accumulator is the single source of truth for "already emitted".
//! Admission is an atomic check-and-set under one lock, so concurrent
//! callers admitting the same key cannot both succeed. Entities are stored
//! in admission order and handed to sinks as one snapshot at flush.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::model::{Category, Product};
use crate::output::{Sink, SinkError};
use crate::url::canonical_key;

/// Immutable view of everything admitted during a run
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub started_at: DateTime<Utc>,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
}

/// What a successful flush wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub categories: usize,
    pub products: usize,
    pub sinks_written: Vec<String>,
}

#[derive(Debug)]
struct Inner {
    started_at: DateTime<Utc>,
    category_ids: HashSet<String>,
    product_keys: HashSet<String>,
    categories: Vec<Category>,
    products: Vec<Product>,
    duplicate_products: usize,
}

impl Inner {
    fn fresh() -> Self {
        Self {
            started_at: Utc::now(),
            category_ids: HashSet::new(),
            product_keys: HashSet::new(),
            categories: Vec::new(),
            products: Vec::new(),
            duplicate_products: 0,
        }
    }
}

/// Admission tables and admission-ordered storage for one run
#[derive(Debug)]
pub struct Accumulator {
    inner: Mutex<Inner>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::fresh()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resets admission tables and stored entities and stamps the run start
    pub fn start_run(&self) {
        *self.lock() = Inner::fresh();
        tracing::debug!("Accumulator reset for a new run");
    }

    /// Returns true only the first time `category_id` is seen in this run
    pub fn admit_category(&self, category_id: &str) -> bool {
        self.lock().category_ids.insert(category_id.to_string())
    }

    /// Returns true only the first time the product URL is seen in this run
    ///
    /// URLs are compared in canonical form, so `https://www.shop.example/p/1/`
    /// and `https://shop.example/p/1?utm_source=x` are the same product.
    pub fn admit_product(&self, url: &str) -> bool {
        let key = product_key(url);
        let mut inner = self.lock();
        let admitted = inner.product_keys.insert(key);
        if !admitted {
            inner.duplicate_products += 1;
        }
        admitted
    }

    /// Admits and stores a category; returns false for a repeated id
    pub fn push_category(&self, category: Category) -> bool {
        let mut inner = self.lock();
        if !inner.category_ids.insert(category.category_id.clone()) {
            return false;
        }
        inner.categories.push(category);
        true
    }

    /// Admits and stores a product; returns false for a repeated URL
    pub fn push_product(&self, product: Product) -> bool {
        let key = product_key(&product.url);
        let mut inner = self.lock();
        if !inner.product_keys.insert(key) {
            inner.duplicate_products += 1;
            return false;
        }
        inner.products.push(product);
        true
    }

    /// Stores a product whose URL was already admitted with `admit_product`
    pub fn store_product(&self, product: Product) {
        self.lock().products.push(product);
    }

    /// Number of product encounters rejected as duplicates
    pub fn duplicate_products(&self) -> usize {
        self.lock().duplicate_products
    }

    pub fn product_count(&self) -> usize {
        self.lock().products.len()
    }

    pub fn category_count(&self) -> usize {
        self.lock().categories.len()
    }

    /// Entities in admission order
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            started_at: inner.started_at,
            categories: inner.categories.clone(),
            products: inner.products.clone(),
        }
    }

    /// Hands one snapshot to every sink
    ///
    /// All sinks are attempted even when one fails; the first failure is
    /// returned after the others have run.
    pub fn flush(&self, sinks: &mut [Box<dyn Sink>]) -> Result<FlushReport, SinkError> {
        let snapshot = self.snapshot();
        let mut sinks_written = Vec::new();
        let mut first_error = None;

        for sink in sinks.iter_mut() {
            match sink.write(&snapshot) {
                Ok(()) => {
                    tracing::info!("Wrote {}", sink.name());
                    sinks_written.push(sink.name().to_string());
                }
                Err(e) => {
                    tracing::error!("Failed to write {}: {}", sink.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(FlushReport {
                categories: snapshot.categories.len(),
                products: snapshot.products.len(),
                sinks_written,
            }),
        }
    }
}

fn product_key(url: &str) -> String {
    match crate::url::normalize_url(url) {
        Ok(parsed) => canonical_key(&parsed),
        Err(_) => url.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SinkResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn product(name: &str, url: &str) -> Product {
        Product {
            name: name.to_string(),
            url: url.to_string(),
            category: "Kitchen".to_string(),
            subcategory: None,
            image_url: None,
            price: None,
            sku: None,
            brand: None,
            description: None,
            stock_status: None,
            extracted_at: Utc::now(),
        }
    }

    struct RecordingSink {
        name: &'static str,
        fail: bool,
        seen: Arc<AtomicUsize>,
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            self.name
        }

        fn write(&mut self, snapshot: &Snapshot) -> SinkResult<()> {
            self.seen.fetch_add(snapshot.products.len(), Ordering::SeqCst);
            if self.fail {
                return Err(SinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only directory",
                )));
            }
            Ok(())
        }
    }

    #[test]
    fn test_idempotent_admission() {
        let acc = Accumulator::new();
        assert!(acc.admit_category("shoes"));
        assert!(!acc.admit_category("shoes"));

        assert!(acc.admit_product("https://shop.example/product/kettle/"));
        assert!(!acc.admit_product("https://shop.example/product/kettle/"));
        assert_eq!(acc.duplicate_products(), 1);
    }

    #[test]
    fn test_admission_uses_canonical_url() {
        let acc = Accumulator::new();
        assert!(acc.push_product(product("Kettle", "https://www.shop.example/product/kettle/")));
        assert!(!acc.push_product(product(
            "Kettle",
            "https://shop.example/product/kettle?utm_source=mail"
        )));

        let snapshot = acc.snapshot();
        assert_eq!(snapshot.products.len(), 1);
        // The record keeps the URL as found
        assert_eq!(snapshot.products[0].url, "https://www.shop.example/product/kettle/");
    }

    #[test]
    fn test_snapshot_in_admission_order() {
        let acc = Accumulator::new();
        acc.push_product(product("B", "https://shop.example/product/b/"));
        acc.push_product(product("A", "https://shop.example/product/a/"));
        acc.push_product(product("B again", "https://shop.example/product/b/"));

        let names: Vec<String> = acc.snapshot().products.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_concurrent_admission_succeeds_once() {
        let acc = Accumulator::new();
        let successes = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    if acc.admit_product("https://shop.example/product/kettle/") {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(acc.duplicate_products(), 15);
    }

    #[test]
    fn test_start_run_resets() {
        let acc = Accumulator::new();
        acc.push_category(Category::new("shoes", "Shoes", "https://shop.example/c/shoes/"));
        acc.start_run();

        assert_eq!(acc.category_count(), 0);
        assert!(acc.admit_category("shoes"));
    }

    #[test]
    fn test_flush_attempts_every_sink() {
        let acc = Accumulator::new();
        acc.push_product(product("Kettle", "https://shop.example/product/kettle/"));

        let seen = Arc::new(AtomicUsize::new(0));
        let mut sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(RecordingSink { name: "first", fail: true, seen: Arc::clone(&seen) }),
            Box::new(RecordingSink { name: "second", fail: false, seen: Arc::clone(&seen) }),
        ];

        let result = acc.flush(&mut sinks);
        assert!(matches!(result, Err(SinkError::Io(_))));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_flush_report() {
        let acc = Accumulator::new();
        acc.push_category(Category::new("shoes", "Shoes", "https://shop.example/c/shoes/"));
        acc.push_product(product("Kettle", "https://shop.example/product/kettle/"));

        let seen = Arc::new(AtomicUsize::new(0));
        let mut sinks: Vec<Box<dyn Sink>> =
            vec![Box::new(RecordingSink { name: "only", fail: false, seen })];

        let report = acc.flush(&mut sinks).unwrap();
        assert_eq!(report.categories, 1);
        assert_eq!(report.products, 1);
        assert_eq!(report.sinks_written, vec!["only".to_string()]);
    }
}
