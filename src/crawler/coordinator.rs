//! Run coordinator - main orchestration logic
//!
//! A run goes through fixed phases:
//! - discovery (or reloading the tree of a previous run)
//! - harvesting every leaf of the tree
//! - admitting the categories and flushing all sinks once
//!
//! Only configuration and sink failures end a run early. Everything the
//! network does wrong is a warning attached to the report.

use std::sync::Arc;

use chrono::Utc;

use super::discoverer::CategoryDiscoverer;
use super::fetcher::{HttpFetcher, PageFetcher};
use super::harvester::ProductHarvester;
use super::scheduler::Scheduler;
use crate::catalog::{Accumulator, Category, CategoryTree, FlushReport, Product};
use crate::config::{CategoryFilter, Config};
use crate::output::{
    default_sinks, output_path, read_categories_json, RunStatistics, Sink, CATEGORIES_JSON,
};
use crate::state::{RunStage, RunStatus, RunWarning};
use crate::CatalogError;

/// Per-invocation choices that are not part of the configuration file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Keep only top-level categories whose name matches
    pub category_filter: Option<CategoryFilter>,

    /// Skip discovery and harvest the leaves of an existing `categories.json`
    pub reuse_categories: bool,
}

/// Result of a run that reached the flush
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub statistics: RunStatistics,
    pub warnings: Vec<RunWarning>,
    pub flush: FlushReport,
}

/// Main run coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    options: RunOptions,
    scheduler: Scheduler,
    accumulator: Accumulator,
    sinks: Vec<Box<dyn Sink>>,
}

impl Coordinator {
    /// Creates a coordinator fetching over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `options` - Filter and discovery choices for this run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CatalogError)` - The HTTP client could not be built
    pub fn new(config: Config, options: RunOptions) -> Result<Self, CatalogError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, options, Arc::new(fetcher)))
    }

    /// Creates a coordinator over any `PageFetcher`
    pub fn with_fetcher(
        config: Config,
        options: RunOptions,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let scheduler = Scheduler::new(fetcher, &config.crawler, &config.user_agent.crawler_name);
        let sinks = default_sinks(&config.output, &config.site.base_url);

        Self {
            config: Arc::new(config),
            options,
            scheduler,
            accumulator: Accumulator::new(),
            sinks,
        }
    }

    /// Replaces the default file sinks
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn Sink>>) -> Self {
        self.sinks = sinks;
        self
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Runs discovery, harvesting and the flush
    pub async fn run(&mut self) -> Result<RunReport, CatalogError> {
        self.accumulator.start_run();
        let started_at = Utc::now();
        tracing::info!("Starting catalog run for {}", self.config.site.base_url);

        let mut warnings = Vec::new();
        let mut identity_conflicts = 0;

        let tree = if self.options.reuse_categories {
            self.reload_tree()?
        } else {
            let discoverer =
                CategoryDiscoverer::new(&self.scheduler, &self.config.site, &self.config.crawler);
            let discovery = discoverer
                .discover(self.options.category_filter.as_ref())
                .await;
            warnings.extend(discovery.warnings);
            identity_conflicts = discovery.identity_conflicts;
            discovery.tree
        };

        let leaves = tree.leaves();
        if leaves.is_empty() {
            tracing::warn!("No categories to harvest");
            warnings.push(RunWarning::new(
                RunStage::Tree,
                self.config.site.base_url.as_str(),
                "no categories discovered",
            ));
        }

        let harvester =
            ProductHarvester::new(&self.scheduler, &self.accumulator, &self.config.crawler);
        let harvest = harvester.harvest(&leaves).await;
        warnings.extend(harvest.warnings);

        let products = self.accumulator.snapshot().products;
        let categories = with_harvested_counts(tree.into_roots(), &products);
        let subcategories = categories
            .iter()
            .map(|c| c.node_count() - 1)
            .sum::<usize>();

        for category in categories {
            if !self.accumulator.push_category(category) {
                tracing::debug!("Category admitted twice, keeping the first");
            }
        }

        let flush = self.accumulator.flush(&mut self.sinks)?;

        let status = RunStatus::from_warnings(&warnings);
        let statistics = RunStatistics {
            started_at,
            finished_at: Utc::now(),
            categories: flush.categories,
            subcategories,
            leaves: leaves.len(),
            products: flush.products,
            duplicate_products: harvest.duplicates,
            dropped_records: harvest.dropped,
            identity_conflicts,
            requests: self.scheduler.requests_made().await,
            warnings: warnings.len(),
        };

        tracing::info!(
            "Run finished: {} ({} categories, {} products, {} warnings)",
            status.as_str(),
            statistics.categories,
            statistics.products,
            warnings.len()
        );

        Ok(RunReport {
            status,
            statistics,
            warnings,
            flush,
        })
    }

    /// Rebuilds the tree from the `categories.json` of a previous run
    fn reload_tree(&self) -> Result<CategoryTree, CatalogError> {
        let path = output_path(&self.config.output, CATEGORIES_JSON);
        tracing::info!("Reusing categories from {}", path.display());

        let mut tree = CategoryTree::from_categories(read_categories_json(&path)?);

        if let Some(filter) = &self.options.category_filter {
            tree.retain_roots(|c| filter.matches(&c.name));
            tracing::info!(
                "Category filter '{}' kept {} categories",
                filter.as_str(),
                tree.roots().len()
            );
        }

        Ok(tree)
    }
}

/// Fills unknown product counts with the number of products harvested
/// under each top-level category
fn with_harvested_counts(mut categories: Vec<Category>, products: &[Product]) -> Vec<Category> {
    for category in &mut categories {
        if category.products_count.is_some() {
            continue;
        }
        let harvested = products.iter().filter(|p| p.category == category.name).count();
        if harvested > 0 {
            category.products_count = u32::try_from(harvested).ok();
        }
    }
    categories
}

/// Runs a complete catalog mapping operation
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `options` - Filter and discovery choices for this run
pub async fn run_catalog(config: Config, options: RunOptions) -> Result<RunReport, CatalogError> {
    Coordinator::new(config, options)?.run().await
}
