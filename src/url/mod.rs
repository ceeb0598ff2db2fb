//! URL handling module for Catalog-Mapper
//!
//! This module provides URL normalization, canonical identity keys for
//! product and page de-duplication, origin extraction for per-origin rate
//! limiting, and category slug derivation.

mod domain;
mod normalize;
mod slug;

// Re-export main functions
pub use domain::{extract_domain, origin_key};
pub use normalize::{canonical_key, normalize_url};
pub use slug::{category_id_for, parent_category_id, slugify};

use url::Url;

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be ignored:
/// - empty hrefs and fragment-only anchors
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - anything that does not resolve to an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use catalog_mapper::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://shop.example.com/product/kettle/").unwrap();
/// let url = resolve_link("/product-category/kitchen/", &base).unwrap();
/// assert_eq!(url.as_str(), "https://shop.example.com/product-category/kitchen/");
/// assert!(resolve_link("mailto:sales@example.com", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}
