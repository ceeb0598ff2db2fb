//! Category discovery by inference from product pages
//!
//! The shop has no category index, so the tree is inferred:
//! 1. seed product pages name the categories they belong to
//! 2. each category's listing page names its subcategories
//!
//! The traversal is fixed at those two levels and bounded by the seed set.
//! Pages are fetched with bounded concurrency, but results are merged in
//! input order so the tree is the same from run to run.

use futures::stream::{self, StreamExt};
use url::Url;

use super::extractor::{
    extract_category_hints, extract_category_page, extract_product_links, extract_subcategories,
    CategoryHint, CategoryPage,
};
use super::fetcher::FetchError;
use super::scheduler::Scheduler;
use crate::catalog::{Category, CategoryTree, FieldConflict, MergeOutcome};
use crate::config::{CategoryFilter, CrawlerConfig, SiteConfig};
use crate::state::{RunStage, RunWarning};
use crate::url::{category_id_for, parent_category_id};

/// Outcome of discovery
#[derive(Debug, Default)]
pub struct Discovery {
    pub tree: CategoryTree,

    /// Degraded branches (failed seed or category pages)
    pub warnings: Vec<RunWarning>,

    /// Differing descriptive fields resolved by keeping the first value
    pub identity_conflicts: usize,

    /// Seed product pages visited
    pub seeds_visited: usize,

    /// Roots removed by the category filter
    pub pruned: Vec<String>,
}

/// Infers the category tree of a shop
pub struct CategoryDiscoverer<'a> {
    scheduler: &'a Scheduler,
    site: &'a SiteConfig,
    crawler: &'a CrawlerConfig,
}

impl<'a> CategoryDiscoverer<'a> {
    pub fn new(scheduler: &'a Scheduler, site: &'a SiteConfig, crawler: &'a CrawlerConfig) -> Self {
        Self {
            scheduler,
            site,
            crawler,
        }
    }

    /// Builds the category tree
    ///
    /// Never fails: a page that cannot be fetched is recorded as a warning
    /// and its branch is skipped.
    ///
    /// # Arguments
    ///
    /// * `filter` - Keep only root categories whose name matches; applied
    ///   before any category page is fetched
    pub async fn discover(&self, filter: Option<&CategoryFilter>) -> Discovery {
        let mut discovery = Discovery::default();

        self.add_seed_categories(&mut discovery);

        let seeds = self.seed_products(&mut discovery.warnings).await;
        discovery.seeds_visited = seeds.len();
        self.categories_from_products(seeds, &mut discovery).await;

        if let Some(filter) = filter {
            let before = discovery.tree.roots().len();
            discovery.pruned = discovery.tree.retain_roots(|c| filter.matches(&c.name));
            tracing::info!(
                "Category filter '{}' kept {} of {} categories",
                filter.as_str(),
                discovery.tree.roots().len(),
                before
            );
            if discovery.tree.is_empty() {
                tracing::warn!("No category matches '{}'", filter.as_str());
            }
        }

        self.expand_categories(&mut discovery).await;

        tracing::info!(
            "Discovered {} categories ({} nodes, {} leaves)",
            discovery.tree.roots().len(),
            discovery.tree.len(),
            discovery.tree.leaves().len()
        );

        discovery
    }

    fn concurrency(&self) -> usize {
        self.crawler.max_concurrent_requests.max(1) as usize
    }

    /// Configured category listing pages enter the tree directly as roots
    fn add_seed_categories(&self, discovery: &mut Discovery) {
        for raw in &self.site.seed_categories {
            let url = match Url::parse(raw) {
                Ok(url) => url,
                Err(e) => {
                    discovery
                        .warnings
                        .push(RunWarning::new(RunStage::Seeds, raw.as_str(), e.to_string()));
                    continue;
                }
            };

            let category_id = category_id_for("", Some(&url));
            if category_id.is_empty() {
                discovery.warnings.push(RunWarning::new(
                    RunStage::Seeds,
                    raw.as_str(),
                    "cannot derive a category id from this URL",
                ));
                continue;
            }

            let name = humanize(&category_id);
            let category = Category::new(category_id.clone(), name, url.to_string());
            let outcome = discovery_merge(&mut discovery.tree, category);
            record_merge(discovery, outcome);
        }
    }

    /// Product pages to infer categories from
    ///
    /// Configured seeds are used as given; otherwise the first
    /// `max-seed-products` product links of the base URL.
    async fn seed_products(&self, warnings: &mut Vec<RunWarning>) -> Vec<Url> {
        if !self.site.seed_products.is_empty() {
            return self
                .site
                .seed_products
                .iter()
                .filter_map(|raw| match Url::parse(raw) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warnings.push(RunWarning::new(
                            RunStage::Seeds,
                            raw.as_str(),
                            e.to_string(),
                        ));
                        None
                    }
                })
                .collect();
        }

        let base = match Url::parse(&self.site.base_url) {
            Ok(url) => url,
            Err(e) => {
                warnings.push(RunWarning::new(
                    RunStage::Seeds,
                    self.site.base_url.as_str(),
                    e.to_string(),
                ));
                return Vec::new();
            }
        };

        match self.scheduler.fetch(&base, self.crawler.render_js).await {
            Ok(doc) => {
                let mut links = extract_product_links(&doc);
                let found = links.len();
                links.truncate(self.crawler.max_seed_products);
                tracing::info!("Found {} product links on {}, using {}", found, base, links.len());
                links
            }
            Err(e) => {
                tracing::warn!("Failed to fetch base URL {}: {}", base, e);
                warnings.push(RunWarning::new(RunStage::Seeds, base.as_str(), e.to_string()));
                Vec::new()
            }
        }
    }

    async fn categories_from_products(&self, seeds: Vec<Url>, discovery: &mut Discovery) {
        let render_js = self.crawler.render_js;

        let results: Vec<(Url, Result<Vec<CategoryHint>, FetchError>)> = stream::iter(seeds)
            .map(|url| async move {
                let hints = self
                    .scheduler
                    .fetch(&url, render_js)
                    .await
                    .map(|doc| extract_category_hints(&doc));
                (url, hints)
            })
            .buffered(self.concurrency())
            .collect()
            .await;

        for (url, result) in results {
            match result {
                Ok(hints) if hints.is_empty() => {
                    tracing::debug!("No category hints on {}", url);
                }
                Ok(hints) => {
                    tracing::debug!("{} category hints on {}", hints.len(), url);
                    for hint in hints {
                        let category =
                            Category::new(hint.category_id, hint.name, hint.url.to_string());
                        let outcome = discovery_merge(&mut discovery.tree, category);
                        record_merge(discovery, outcome);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping seed product {}: {}", url, e);
                    discovery
                        .warnings
                        .push(RunWarning::new(RunStage::SeedProduct, url.as_str(), e.to_string()));
                }
            }
        }

        nest_by_url(discovery);
    }

    /// Second pass: the listing page of every category seen so far, for
    /// subcategories and descriptive fields
    async fn expand_categories(&self, discovery: &mut Discovery) {
        let render_js = self.crawler.render_js;

        let targets: Vec<(String, String)> = discovery
            .tree
            .nodes()
            .into_iter()
            .map(|c| (c.category_id.clone(), c.url.clone()))
            .collect();

        type PageResult = Result<(Vec<CategoryHint>, CategoryPage), FetchError>;

        let results: Vec<(String, String, Option<PageResult>)> = stream::iter(targets)
            .map(|(id, raw_url)| async move {
                let result = match Url::parse(&raw_url) {
                    Ok(url) => Some(
                        self.scheduler
                            .fetch(&url, render_js)
                            .await
                            .map(|doc| {
                                (extract_subcategories(&doc, &id), extract_category_page(&doc))
                            }),
                    ),
                    Err(_) => None,
                };
                (id, raw_url, result)
            })
            .buffered(self.concurrency())
            .collect()
            .await;

        for (id, url, result) in results {
            match result {
                Some(Ok((hints, page))) => {
                    let conflicts = discovery
                        .tree
                        .describe(&id, page.description, page.image_url, page.products_count);
                    log_conflicts(&conflicts);
                    discovery.identity_conflicts += conflicts.len();

                    let subcategories: Vec<Category> = hints
                        .into_iter()
                        .map(|hint| {
                            Category::new(hint.category_id, hint.name, hint.url.to_string())
                        })
                        .collect();
                    let found = subcategories.len();

                    if let Some(outcome) = discovery.tree.attach_subcategories(&id, subcategories) {
                        record_merge(discovery, outcome);
                    }
                    tracing::info!("Category '{}': {} subcategories", id, found);
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        "Category page {} failed, treating '{}' as a leaf: {}",
                        url,
                        id,
                        e
                    );
                    discovery
                        .warnings
                        .push(RunWarning::new(RunStage::CategoryPage, url, e.to_string()));
                }
                None => {
                    discovery.warnings.push(RunWarning::new(
                        RunStage::CategoryPage,
                        url,
                        "invalid category URL",
                    ));
                }
            }
        }
    }
}

/// Moves every root whose URL nests below another known category under
/// that category
///
/// Product pages commonly list a category next to its parent, e.g.
/// `product-category/dairy/` and `product-category/dairy/milk/`.
fn nest_by_url(discovery: &mut Discovery) {
    let moves: Vec<(String, Category)> = discovery
        .tree
        .roots()
        .iter()
        .filter_map(|root| {
            let parent = Url::parse(&root.url)
                .ok()
                .and_then(|url| parent_category_id(&url))?;
            let known = parent != root.category_id && discovery.tree.contains(&parent);
            known.then(|| {
                let child = Category::new(
                    root.category_id.clone(),
                    root.name.clone(),
                    root.url.clone(),
                );
                (parent, child)
            })
        })
        .collect();

    for (parent, child) in moves {
        tracing::debug!("Category '{}' nests under '{}'", child.category_id, parent);
        if let Some(outcome) = discovery.tree.attach_subcategories(&parent, vec![child]) {
            record_merge(discovery, outcome);
        }
    }
}

fn discovery_merge(tree: &mut CategoryTree, category: Category) -> MergeOutcome {
    let id = category.category_id.clone();
    let outcome = tree.merge(category);
    if outcome == MergeOutcome::Inserted {
        tracing::debug!("New category '{}'", id);
    }
    outcome
}

fn record_merge(discovery: &mut Discovery, outcome: MergeOutcome) {
    let conflicts = outcome.conflicts();
    log_conflicts(conflicts);
    discovery.identity_conflicts += conflicts.len();
}

fn log_conflicts(conflicts: &[FieldConflict]) {
    for conflict in conflicts {
        tracing::warn!(
            "Identity conflict on '{}' {}: kept '{}', ignored '{}'",
            conflict.category_id,
            conflict.field,
            conflict.kept,
            conflict.ignored
        );
    }
}

/// "fresh-food" → "Fresh Food"
fn humanize(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
