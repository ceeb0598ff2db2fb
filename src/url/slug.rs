//! Category identity slugs

use url::Url;

/// Path marker WooCommerce-style shops put in front of category slugs
const CATEGORY_PATH_MARKER: &str = "product-category";

/// Converts free text into a lowercase, hyphen-separated slug
///
/// Alphanumeric characters (including non-ASCII letters) are kept and
/// lowercased; every other run of characters becomes a single hyphen.
///
/// # Examples
///
/// ```
/// use catalog_mapper::url::slugify;
///
/// assert_eq!(slugify("  Home & Kitchen "), "home-kitchen");
/// assert_eq!(slugify("Café Équipement"), "café-équipement");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Derives the stable `category_id` of a category
///
/// Resolution order:
/// 1. the deepest slug under `product-category/` (nested categories carry
///    their parents' slugs first, so the last one is the category's own)
/// 2. the last non-empty path segment of the URL
/// 3. the slugified name
///
/// A trailing `page/<n>` pagination suffix is ignored.
///
/// # Examples
///
/// ```
/// use catalog_mapper::url::category_id_for;
/// use url::Url;
///
/// let url = Url::parse("https://shop.example/product-category/shoes/running/").unwrap();
/// assert_eq!(category_id_for("Running Shoes", Some(&url)), "running");
/// assert_eq!(category_id_for("Running Shoes", None), "running-shoes");
/// ```
pub fn category_id_for(name: &str, url: Option<&Url>) -> String {
    let from_url = url.and_then(|url| {
        let segments = category_segments(url);

        let marked = segments
            .iter()
            .position(|segment| *segment == CATEGORY_PATH_MARKER)
            .and_then(|index| segments[index + 1..].last());

        marked
            .or_else(|| segments.last().filter(|s| **s != CATEGORY_PATH_MARKER))
            .map(|segment| slugify(&decode_segment(segment)))
            .filter(|slug| !slug.is_empty())
    });

    from_url.unwrap_or_else(|| slugify(name))
}

/// Derives the `category_id` of the category a nested category URL sits
/// under
///
/// Returns `None` unless the URL has at least two slugs after
/// `product-category/`.
///
/// # Examples
///
/// ```
/// use catalog_mapper::url::parent_category_id;
/// use url::Url;
///
/// let nested = Url::parse("https://shop.example/product-category/dairy/milk/").unwrap();
/// assert_eq!(parent_category_id(&nested).as_deref(), Some("dairy"));
///
/// let top = Url::parse("https://shop.example/product-category/dairy/").unwrap();
/// assert_eq!(parent_category_id(&top), None);
/// ```
pub fn parent_category_id(url: &Url) -> Option<String> {
    let segments = category_segments(url);
    let index = segments
        .iter()
        .position(|segment| *segment == CATEGORY_PATH_MARKER)?;

    match &segments[index + 1..] {
        [.., parent, _] => Some(slugify(&decode_segment(parent))).filter(|slug| !slug.is_empty()),
        _ => None,
    }
}

/// Non-empty path segments, without a trailing `page/<n>`
fn category_segments(url: &Url) -> Vec<&str> {
    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();

    let paginated = matches!(
        segments.as_slice(),
        [.., "page", number] if number.chars().all(|c| c.is_ascii_digit())
    );
    if paginated {
        segments.truncate(segments.len() - 2);
    }

    segments
}

fn decode_segment(segment: &str) -> String {
    ::url::form_urlencoded::parse(format!("s={}", segment).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| segment.to_string())
}
