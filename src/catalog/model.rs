use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A category node of the catalog tree
///
/// Created and mutated only during discovery. Depth is unbounded in the
/// model even though shops observed so far nest a single level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Stable slug, unique across the whole tree within a run
    pub category_id: String,

    pub name: String,

    pub url: String,

    pub description: Option<String>,

    pub image_url: Option<String>,

    #[serde(default)]
    pub subcategories: Vec<Category>,

    /// Best-effort count reported by the category listing page
    pub products_count: Option<u32>,

    pub discovered_at: DateTime<Utc>,
}

impl Category {
    /// Creates a category with no descriptive fields and no children
    pub fn new(
        category_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            name: name.into(),
            url: url.into(),
            description: None,
            image_url: None,
            subcategories: Vec::new(),
            products_count: None,
            discovered_at: Utc::now(),
        }
    }

    /// Returns true if this category has no subcategories
    pub fn is_leaf(&self) -> bool {
        self.subcategories.is_empty()
    }

    /// Finds a node by id in this subtree (including self)
    pub fn find(&self, category_id: &str) -> Option<&Category> {
        if self.category_id == category_id {
            return Some(self);
        }
        self.subcategories
            .iter()
            .find_map(|child| child.find(category_id))
    }

    /// Collects every id in this subtree, depth first
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = vec![self.category_id.as_str()];
        for child in &self.subcategories {
            ids.extend(child.ids());
        }
        ids
    }

    /// Number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        1 + self
            .subcategories
            .iter()
            .map(Category::node_count)
            .sum::<usize>()
    }
}

/// A product record harvested from a listing page
///
/// Immutable once created. Only `name` and `url` are guaranteed; every
/// other field is best-effort and `None` when the page did not show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,

    /// Identity of the product within a run (compared in canonical form)
    pub url: String,

    /// Name of the top-level category the product was harvested under
    pub category: String,

    /// Name of the leaf subcategory, `None` when harvested from a category
    /// without subcategories
    pub subcategory: Option<String>,

    pub image_url: Option<String>,

    /// Price as displayed, currency included
    pub price: Option<String>,

    pub sku: Option<String>,

    pub brand: Option<String>,

    pub description: Option<String>,

    pub stock_status: Option<String>,

    pub extracted_at: DateTime<Utc>,
}
