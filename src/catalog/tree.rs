//! Id-keyed category tree with an explicit merge
//!
//! Discovery builds the tree progressively: every category reached from a
//! seed product page or a category listing page is merged in by id. An id
//! is unique across the whole tree, so two discovery paths resolving to the
//! same id land on the same node.

use std::collections::HashSet;

use super::model::Category;

/// Result of merging one category into the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The id was new and the category became a root
    Inserted,

    /// The id already existed and the incoming category was folded into it
    Merged {
        added_subcategories: usize,
        conflicts: Vec<FieldConflict>,
    },
}

impl MergeOutcome {
    pub fn conflicts(&self) -> &[FieldConflict] {
        match self {
            MergeOutcome::Inserted => &[],
            MergeOutcome::Merged { conflicts, .. } => conflicts,
        }
    }
}

/// A descriptive field that differed between two sightings of one category
///
/// The first-seen value is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConflict {
    pub category_id: String,
    pub field: &'static str,
    pub kept: String,
    pub ignored: String,
}

/// A unit of harvesting: a subcategory, or a category without subcategories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub category_id: String,

    /// Name of the top-level category
    pub category: String,

    /// Name of the leaf when it sits below a top-level category
    pub subcategory: Option<String>,

    pub url: String,
}

/// Category tree keyed by `category_id`
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    roots: Vec<Category>,
    ids: HashSet<String>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a tree from previously persisted root categories
    pub fn from_categories(categories: Vec<Category>) -> Self {
        let mut tree = Self::new();
        for category in categories {
            tree.merge(category);
        }
        tree
    }

    /// Merges a category into the tree
    ///
    /// If no node carries the id, the category becomes a new root.
    /// Otherwise the existing node keeps its first-seen descriptive fields,
    /// absent fields are filled from `incoming`, and subcategories are
    /// unioned by id in first-seen order.
    pub fn merge(&mut self, incoming: Category) -> MergeOutcome {
        if let Some(existing) = find_mut(&mut self.roots, &incoming.category_id) {
            let mut conflicts = Vec::new();
            let added = merge_into(existing, incoming, &mut self.ids, &mut conflicts);
            return MergeOutcome::Merged {
                added_subcategories: added,
                conflicts,
            };
        }

        let category = claim_ids(incoming, &mut self.ids);
        self.roots.push(category);
        MergeOutcome::Inserted
    }

    /// Attaches subcategories to an existing node
    ///
    /// A subcategory whose id is currently a root is moved below
    /// `parent_id`, keeping its first-seen fields and its own subtree.
    /// Returns `None` if `parent_id` is not in the tree.
    pub fn attach_subcategories(
        &mut self,
        parent_id: &str,
        subcategories: Vec<Category>,
    ) -> Option<MergeOutcome> {
        if !self.contains(parent_id) {
            return None;
        }

        let mut conflicts = Vec::new();
        let subcategories: Vec<Category> = subcategories
            .into_iter()
            .map(|child| self.adopt_root(parent_id, child, &mut conflicts))
            .collect();

        let parent = find_mut(&mut self.roots, parent_id)?;
        let mut incoming = Category::new(
            parent.category_id.clone(),
            parent.name.clone(),
            parent.url.clone(),
        );
        incoming.subcategories = subcategories;

        let added = merge_into(parent, incoming, &mut self.ids, &mut conflicts);
        Some(MergeOutcome::Merged {
            added_subcategories: added,
            conflicts,
        })
    }

    /// Detaches the root carrying `child`'s id, if any, and folds `child`
    /// into it
    ///
    /// A root is never moved below one of its own descendants.
    fn adopt_root(
        &mut self,
        parent_id: &str,
        child: Category,
        conflicts: &mut Vec<FieldConflict>,
    ) -> Category {
        let Some(index) = self
            .roots
            .iter()
            .position(|root| root.category_id == child.category_id)
        else {
            return child;
        };
        if self.roots[index].find(parent_id).is_some() {
            return child;
        }

        let mut root = self.roots.remove(index);
        for id in root.ids() {
            self.ids.remove(id);
        }
        tracing::debug!(
            "Moving category '{}' below '{}'",
            root.category_id,
            parent_id
        );

        let mut placed: HashSet<String> = root.ids().into_iter().map(str::to_string).collect();
        merge_into(&mut root, child, &mut placed, conflicts);
        root
    }

    /// Nodes in pre-order: each root, then its subcategories
    pub fn nodes(&self) -> Vec<&Category> {
        fn walk<'a>(nodes: &'a [Category], out: &mut Vec<&'a Category>) {
            for node in nodes {
                out.push(node);
                walk(&node.subcategories, out);
            }
        }

        let mut out = Vec::with_capacity(self.ids.len());
        walk(&self.roots, &mut out);
        out
    }

    /// Fills absent descriptive fields of an existing node
    ///
    /// Conflicting present values are reported, never overwritten.
    pub fn describe(
        &mut self,
        category_id: &str,
        description: Option<String>,
        image_url: Option<String>,
        products_count: Option<u32>,
    ) -> Vec<FieldConflict> {
        let mut conflicts = Vec::new();
        if let Some(node) = find_mut(&mut self.roots, category_id) {
            let id = node.category_id.as_str();
            fill_field(id, "description", &mut node.description, description, &mut conflicts);
            fill_field(id, "image_url", &mut node.image_url, image_url, &mut conflicts);
            if node.products_count.is_none() {
                node.products_count = products_count;
            }
        }
        conflicts
    }

    /// Keeps only the roots for which `keep` returns true
    ///
    /// Returns the ids of the removed roots.
    pub fn retain_roots<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&Category) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.roots.len());

        for root in std::mem::take(&mut self.roots) {
            if keep(&root) {
                kept.push(root);
            } else {
                for id in root.ids() {
                    self.ids.remove(id);
                }
                removed.push(root.category_id);
            }
        }

        self.roots = kept;
        removed
    }

    /// Harvesting leaves in tree order
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        for root in &self.roots {
            if root.is_leaf() {
                leaves.push(Leaf {
                    category_id: root.category_id.clone(),
                    category: root.name.clone(),
                    subcategory: None,
                    url: root.url.clone(),
                });
            } else {
                collect_leaves(&root.name, &root.subcategories, &mut leaves);
            }
        }
        leaves
    }

    pub fn find(&self, category_id: &str) -> Option<&Category> {
        self.roots.iter().find_map(|root| root.find(category_id))
    }

    pub fn contains(&self, category_id: &str) -> bool {
        self.ids.contains(category_id)
    }

    pub fn roots(&self) -> &[Category] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<Category> {
        self.roots
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn collect_leaves(root_name: &str, nodes: &[Category], leaves: &mut Vec<Leaf>) {
    for node in nodes {
        if node.is_leaf() {
            leaves.push(Leaf {
                category_id: node.category_id.clone(),
                category: root_name.to_string(),
                subcategory: Some(node.name.clone()),
                url: node.url.clone(),
            });
        } else {
            collect_leaves(root_name, &node.subcategories, leaves);
        }
    }
}

fn find_mut<'a>(nodes: &'a mut [Category], category_id: &str) -> Option<&'a mut Category> {
    for node in nodes.iter_mut() {
        if node.category_id == category_id {
            return Some(node);
        }
        if let Some(found) = find_mut(&mut node.subcategories, category_id) {
            return Some(found);
        }
    }
    None
}

/// Registers every id of a new subtree, dropping descendants whose id is
/// already placed elsewhere in the tree
fn claim_ids(mut category: Category, ids: &mut HashSet<String>) -> Category {
    ids.insert(category.category_id.clone());

    let children = std::mem::take(&mut category.subcategories);
    for child in children {
        if ids.contains(&child.category_id) {
            tracing::debug!(
                "Category '{}' already placed in the tree, skipping under '{}'",
                child.category_id,
                category.category_id
            );
            continue;
        }
        category.subcategories.push(claim_ids(child, ids));
    }

    category
}

fn merge_into(
    existing: &mut Category,
    incoming: Category,
    ids: &mut HashSet<String>,
    conflicts: &mut Vec<FieldConflict>,
) -> usize {
    let id = existing.category_id.clone();

    if existing.name != incoming.name && !incoming.name.is_empty() {
        conflicts.push(FieldConflict {
            category_id: id.clone(),
            field: "name",
            kept: existing.name.clone(),
            ignored: incoming.name,
        });
    }
    fill_field(&id, "description", &mut existing.description, incoming.description, conflicts);
    fill_field(&id, "image_url", &mut existing.image_url, incoming.image_url, conflicts);
    if existing.products_count.is_none() {
        existing.products_count = incoming.products_count;
    }

    let mut added = 0;
    for child in incoming.subcategories {
        let position = existing
            .subcategories
            .iter()
            .position(|c| c.category_id == child.category_id);

        match position {
            Some(index) => {
                added += merge_into(&mut existing.subcategories[index], child, ids, conflicts);
            }
            None if ids.contains(&child.category_id) => {
                tracing::debug!(
                    "Category '{}' already placed in the tree, skipping under '{}'",
                    child.category_id,
                    id
                );
            }
            None => {
                existing.subcategories.push(claim_ids(child, ids));
                added += 1;
            }
        }
    }

    added
}

fn fill_field(
    category_id: &str,
    field: &'static str,
    slot: &mut Option<String>,
    incoming: Option<String>,
    conflicts: &mut Vec<FieldConflict>,
) {
    match (slot.as_ref(), incoming) {
        (None, incoming) => *slot = incoming,
        (Some(kept), Some(ignored)) if *kept != ignored => conflicts.push(FieldConflict {
            category_id: category_id.to_string(),
            field,
            kept: kept.clone(),
            ignored,
        }),
        _ => {}
    }
}
