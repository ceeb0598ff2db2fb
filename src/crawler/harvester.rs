//! Product harvesting from leaf category listings
//!
//! Each leaf is paged through in order, following the "next page" link
//! until there is none, it points back to a page already visited, or the
//! per-leaf page cap is reached. Leaves run concurrently; their products
//! are admitted in leaf order so the output does not depend on timing.

use std::collections::HashSet;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use url::Url;

use super::extractor::{extract_next_page, extract_product_details, extract_products, ProductStub};
use super::scheduler::Scheduler;
use crate::catalog::{Accumulator, Leaf, Product};
use crate::config::CrawlerConfig;
use crate::state::{RunStage, RunWarning};
use crate::url::canonical_key;

/// Outcome of harvesting every leaf
#[derive(Debug, Default)]
pub struct Harvest {
    pub warnings: Vec<RunWarning>,

    /// Listing pages fetched
    pub pages_fetched: usize,

    /// Products admitted for the first time
    pub products_admitted: usize,

    /// Product encounters rejected because the URL was already admitted
    pub duplicates: usize,

    /// Product cards skipped for lack of a name or link
    pub dropped: usize,
}

/// What one leaf produced, before admission
#[derive(Debug, Default)]
struct LeafHarvest {
    products: Vec<Product>,
    warnings: Vec<RunWarning>,
    pages_fetched: usize,
    dropped: usize,
}

/// Pages through leaf listings and hands products to the accumulator
pub struct ProductHarvester<'a> {
    scheduler: &'a Scheduler,
    accumulator: &'a Accumulator,
    crawler: &'a CrawlerConfig,
}

impl<'a> ProductHarvester<'a> {
    pub fn new(
        scheduler: &'a Scheduler,
        accumulator: &'a Accumulator,
        crawler: &'a CrawlerConfig,
    ) -> Self {
        Self {
            scheduler,
            accumulator,
            crawler,
        }
    }

    /// Harvests every leaf
    ///
    /// A product listed under several leaves is kept once, attributed to
    /// the first leaf in `leaves` that lists it.
    pub async fn harvest(&self, leaves: &[Leaf]) -> Harvest {
        let concurrency = self.crawler.max_concurrent_requests.max(1) as usize;

        let per_leaf: Vec<LeafHarvest> = stream::iter(leaves)
            .map(|leaf| self.harvest_leaf(leaf))
            .buffered(concurrency)
            .collect()
            .await;

        let mut harvest = Harvest::default();
        let mut admitted = Vec::new();

        for leaf in per_leaf {
            harvest.pages_fetched += leaf.pages_fetched;
            harvest.dropped += leaf.dropped;
            harvest.warnings.extend(leaf.warnings);

            for product in leaf.products {
                if self.accumulator.admit_product(&product.url) {
                    admitted.push(product);
                } else {
                    tracing::trace!("Duplicate product {}", product.url);
                    harvest.duplicates += 1;
                }
            }
        }

        if self.crawler.fetch_product_details {
            admitted = self.enrich(admitted, concurrency).await;
        }

        harvest.products_admitted = admitted.len();
        for product in admitted {
            self.accumulator.store_product(product);
        }

        tracing::info!(
            "Harvested {} products from {} pages ({} duplicates, {} dropped)",
            harvest.products_admitted,
            harvest.pages_fetched,
            harvest.duplicates,
            harvest.dropped
        );

        harvest
    }

    async fn harvest_leaf(&self, leaf: &Leaf) -> LeafHarvest {
        let mut result = LeafHarvest::default();

        let start = match Url::parse(&leaf.url) {
            Ok(url) => url,
            Err(e) => {
                result
                    .warnings
                    .push(RunWarning::new(RunStage::Listing, leaf.url.as_str(), e.to_string()));
                return result;
            }
        };

        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(url) = next.take() {
            if !visited.insert(canonical_key(&url)) {
                tracing::debug!(
                    "Pagination of '{}' loops back to {}, stopping",
                    leaf.category_id,
                    url
                );
                break;
            }
            if result.pages_fetched >= self.crawler.max_pages_per_leaf {
                tracing::warn!(
                    "Leaf '{}' reached {} pages, stopping",
                    leaf.category_id,
                    self.crawler.max_pages_per_leaf
                );
                result.warnings.push(RunWarning::new(
                    RunStage::Listing,
                    url.as_str(),
                    format!("page cap of {} reached", self.crawler.max_pages_per_leaf),
                ));
                break;
            }

            let doc = match self.scheduler.fetch(&url, self.crawler.render_js).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(
                        "Listing page {} failed, stopping leaf '{}': {}",
                        url,
                        leaf.category_id,
                        e
                    );
                    result
                        .warnings
                        .push(RunWarning::new(RunStage::Listing, url.as_str(), e.to_string()));
                    break;
                }
            };
            result.pages_fetched += 1;

            let extraction = extract_products(&doc);
            for dropped in &extraction.dropped {
                tracing::debug!("Dropped record on {}: {}", url, dropped.reason);
            }
            result.dropped += extraction.dropped.len();
            tracing::debug!(
                "{} products on page {} of '{}'",
                extraction.records.len(),
                result.pages_fetched,
                leaf.category_id
            );

            result
                .products
                .extend(extraction.records.into_iter().map(|stub| product_for(stub, leaf)));

            next = extract_next_page(&doc);
        }

        result
    }

    /// Fills absent SKU, brand and description from detail pages
    ///
    /// A failed detail fetch leaves the product as it was.
    async fn enrich(&self, products: Vec<Product>, concurrency: usize) -> Vec<Product> {
        let render_js = self.crawler.render_js;

        stream::iter(products)
            .map(|mut product| async move {
                let complete = product.sku.is_some()
                    && product.brand.is_some()
                    && product.description.is_some();
                if complete {
                    return product;
                }

                let url = match Url::parse(&product.url) {
                    Ok(url) => url,
                    Err(_) => return product,
                };

                match self.scheduler.fetch(&url, render_js).await {
                    Ok(doc) => {
                        let details = extract_product_details(&doc);
                        product.sku = product.sku.or(details.sku);
                        product.brand = product.brand.or(details.brand);
                        product.description = product.description.or(details.description);
                    }
                    Err(e) => {
                        tracing::debug!("Detail page {} failed: {}", url, e);
                    }
                }
                product
            })
            .buffered(concurrency)
            .collect()
            .await
    }
}

fn product_for(stub: ProductStub, leaf: &Leaf) -> Product {
    Product {
        name: stub.name,
        url: stub.url.to_string(),
        category: leaf.category.clone(),
        subcategory: leaf.subcategory.clone(),
        image_url: stub.image_url,
        price: stub.price,
        sku: stub.sku,
        brand: stub.brand,
        description: stub.description,
        stock_status: stub.stock_status,
        extracted_at: Utc::now(),
    }
}
