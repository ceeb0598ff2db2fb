//! HTML extraction for shop pages
//!
//! Every function here is pure: it parses a fetched `Document` and returns
//! plain data. Nothing touches the network or the filesystem, so the whole
//! module is testable from HTML fixtures.
//!
//! Each field is looked up through a selector cascade: the first selector
//! that yields a usable value wins. Missing optional fields are `None`,
//! never guessed. Records lacking a name or URL are reported as dropped.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::fetcher::Document;
use crate::url::{canonical_key, category_id_for, resolve_link};

/// Maximum description length kept, in characters
pub const DESCRIPTION_LIMIT: usize = 400;

const PRODUCT_LINK_SELECTORS: &[&str] = &[
    ".product a[href*=\"product\"]",
    ".woocommerce-product a[href*=\"product\"]",
    ".product-item a[href*=\"product\"]",
    "a[href*=\"product\"]",
];

const CATEGORY_HINT_SELECTORS: &[&str] = &[
    ".posted_in a",
    ".product-categories a",
    ".woocommerce-product-categories a",
    ".woocommerce-breadcrumb a",
    "[class*=\"breadcrumb\"] a",
];

const SUBCATEGORY_SELECTORS: &[&str] = &[
    ".product-subcategories a",
    ".subcategories a",
    ".category-children a",
    ".sub-categories a",
    "li.product-category a",
    ".product-categories a",
    ".category-list a",
];

const HEADING_SELECTOR: &str = "h2, h3, h4, strong, span";

const PRODUCT_CARD_SELECTORS: &[&str] = &[
    "ul.products li.product",
    ".product",
    ".woocommerce-product",
    ".product-item",
    ".product-card",
    ".product-box",
];

const NAME_SELECTORS: &[&str] = &[
    ".woocommerce-loop-product__title",
    ".product-title",
    ".product-name",
    "h2",
    "h3",
    "h4",
    ".title",
];

const PRICE_SELECTORS: &[&str] = &[
    ".price",
    ".product-price",
    ".woocommerce-Price-amount",
    "[class*=\"price\"]",
    ".amount",
];

const SKU_SELECTORS: &[&str] = &[".sku", ".product-sku"];

const SKU_ATTRIBUTES: &[&str] = &["data-sku", "data-product_sku"];

const BRAND_SELECTORS: &[&str] = &[".brand", ".product-brand"];

const EXCERPT_SELECTORS: &[&str] = &[
    ".woocommerce-product-details__short-description",
    ".product-short-description",
    ".short-description",
    ".product-excerpt",
    ".excerpt",
    ".product-description",
];

const DETAIL_DESCRIPTION_SELECTORS: &[&str] = &[
    ".woocommerce-product-details__short-description",
    "#tab-description",
];

const STOCK_SELECTORS: &[&str] = &[
    ".stock",
    ".availability",
    ".in-stock",
    ".out-of-stock",
    "[class*=\"stock\"]",
];

const NEXT_PAGE_SELECTORS: &[&str] = &[
    "link[rel=\"next\"]",
    "a[rel=\"next\"]",
    "a.next",
    ".pagination .next a",
    "li.next a",
];

/// A category link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryHint {
    pub name: String,
    pub url: Url,
    pub category_id: String,
}

/// Descriptive fields of a category listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPage {
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub products_count: Option<u32>,
}

/// One product card from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStub {
    pub name: String,
    pub url: Url,
    pub image_url: Option<String>,
    pub price: Option<String>,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub stock_status: Option<String>,
}

/// Fields only a product detail page carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetails {
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
}

/// A record skipped because an identity field was missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub reason: String,
}

/// Records extracted from one page, plus the ones that were dropped
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub dropped: Vec<DroppedRecord>,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

/// Extracts product page links from a homepage or listing page
///
/// Links to category pages and add-to-cart actions are excluded. Results
/// are de-duplicated by canonical URL in document order.
///
/// # Arguments
///
/// * `doc` - The fetched page
///
/// # Returns
///
/// Absolute product URLs, from the first selector that yields any
pub fn extract_product_links(doc: &Document) -> Vec<Url> {
    let html = Html::parse_document(&doc.body);
    let base = doc.base_url();

    for css in PRODUCT_LINK_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };

        let mut seen = HashSet::new();
        let links: Vec<Url> = html
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve_link(href, base))
            .filter(is_product_url)
            .filter(|url| seen.insert(canonical_key(url)))
            .collect();

        if !links.is_empty() {
            tracing::trace!("Product links matched by '{}': {}", css, links.len());
            return links;
        }
    }

    Vec::new()
}

/// Extracts the categories a product page lists the product under
///
/// Sources, first one that yields any hint wins:
/// 1. links following a "Product categories" heading
/// 2. `.posted_in`, product category widgets, then breadcrumbs
///
/// Only links whose URL mentions `category` qualify.
pub fn extract_category_hints(doc: &Document) -> Vec<CategoryHint> {
    let html = Html::parse_document(&doc.body);
    let base = doc.base_url();

    let from_heading = hints_from(links_after_heading(&html, "product categories"), base, None);
    if !from_heading.is_empty() {
        return from_heading;
    }

    for css in CATEGORY_HINT_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };
        let hints = hints_from(html.select(&selector).collect(), base, None);
        if !hints.is_empty() {
            return hints;
        }
    }

    Vec::new()
}

/// Extracts subcategory links from a category listing page
///
/// Links resolving to `parent_id` are removed (shops commonly list the
/// parent itself first), as are repeated ids.
pub fn extract_subcategories(doc: &Document, parent_id: &str) -> Vec<CategoryHint> {
    let html = Html::parse_document(&doc.body);
    let base = doc.base_url();

    for css in SUBCATEGORY_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };
        let hints = hints_from(html.select(&selector).collect(), base, Some(parent_id));
        if !hints.is_empty() {
            return hints;
        }
    }

    hints_from(links_after_heading(&html, "subcategories"), base, Some(parent_id))
}

/// Extracts the descriptive fields of a category listing page
pub fn extract_category_page(doc: &Document) -> CategoryPage {
    let html = Html::parse_document(&doc.body);
    let root = html.root_element();
    let base = doc.base_url();

    let description = first_text(root, &[".term-description", ".category-description"])
        .or_else(|| meta_content(&html, "meta[name=\"description\"]"))
        .map(|text| truncate_description(&text));

    let image_url = selector(".category-image img")
        .and_then(|s| root.select(&s).find_map(|img| image_source(img, base)))
        .or_else(|| {
            meta_content(&html, "meta[property=\"og:image\"]")
                .and_then(|src| resolve_link(&src, base))
                .map(String::from)
        });

    let products_count = first_text(root, &[".woocommerce-result-count"])
        .and_then(|text| parse_result_count(&text));

    CategoryPage {
        description,
        image_url,
        products_count,
    }
}

/// Extracts the product cards of a listing page
pub fn extract_products(doc: &Document) -> Extraction<ProductStub> {
    let html = Html::parse_document(&doc.body);
    let base = doc.base_url();

    let mut extraction = Extraction::default();

    for css in PRODUCT_CARD_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };

        // Subcategory tiles share the product card markup
        let cards: Vec<ElementRef> = html
            .select(&selector)
            .filter(|card| !card.value().classes().any(|c| c == "product-category"))
            .collect();
        if cards.is_empty() {
            continue;
        }

        for card in cards {
            match product_from_card(card, base) {
                Ok(stub) => extraction.records.push(stub),
                Err(dropped) => extraction.dropped.push(dropped),
            }
        }
        break;
    }

    extraction
}

/// Finds the "next page" link of a paginated listing
pub fn extract_next_page(doc: &Document) -> Option<Url> {
    let html = Html::parse_document(&doc.body);
    let base = doc.base_url();

    NEXT_PAGE_SELECTORS.iter().find_map(|css| {
        let selector = selector(css)?;
        html.select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| resolve_link(href, base))
    })
}

/// Extracts brand, SKU and description from a product detail page
pub fn extract_product_details(doc: &Document) -> ProductDetails {
    let html = Html::parse_document(&doc.body);
    let root = html.root_element();

    let sku = first_text(root, SKU_SELECTORS)
        .filter(|sku| !is_placeholder(sku))
        .or_else(|| labelled_value(root, "sku"));

    let brand = first_text(root, BRAND_SELECTORS).or_else(|| labelled_value(root, "brand"));

    let description = short_description_items(root)
        .or_else(|| first_text(root, DETAIL_DESCRIPTION_SELECTORS))
        .map(|text| truncate_description(&text));

    ProductDetails {
        brand,
        sku,
        description,
    }
}

/// Truncates a description to `DESCRIPTION_LIMIT` characters plus "..."
pub fn truncate_description(text: &str) -> String {
    let text = collapse_whitespace(text);
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text;
    }
    let kept: String = text.chars().take(DESCRIPTION_LIMIT).collect();
    format!("{}...", kept.trim_end())
}

fn product_from_card(card: ElementRef, base: &Url) -> Result<ProductStub, DroppedRecord> {
    let url = card_url(card, base);

    let name = first_text(card, NAME_SELECTORS).or_else(|| {
        selector("a[title]").and_then(|s| {
            card.select(&s)
                .filter_map(|a| a.value().attr("title"))
                .map(collapse_whitespace)
                .find(|t| !t.is_empty())
        })
    });

    let (name, url) = match (name, url) {
        (Some(name), Some(url)) => (name, url),
        (None, Some(url)) => {
            return Err(DroppedRecord {
                reason: format!("product card without a name ({})", url),
            })
        }
        (Some(name), None) => {
            return Err(DroppedRecord {
                reason: format!("product card without a link ('{}')", name),
            })
        }
        (None, None) => {
            return Err(DroppedRecord {
                reason: "product card without a name or link".to_string(),
            })
        }
    };

    let image_url = selector("img")
        .and_then(|s| card.select(&s).find_map(|img| image_source(img, base)));

    let description = first_text(card, EXCERPT_SELECTORS).map(|text| truncate_description(&text));

    Ok(ProductStub {
        name,
        url,
        image_url,
        price: card_price(card),
        sku: card_sku(card),
        brand: first_text(card, BRAND_SELECTORS),
        description,
        stock_status: card_stock(card),
    })
}

/// First link of a card, preferring product links over everything else
fn card_url(card: ElementRef, base: &Url) -> Option<Url> {
    let selector = selector("a[href]")?;
    let links: Vec<Url> = card
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.contains("add-to-cart"))
        .filter_map(|href| resolve_link(href, base))
        .collect();

    links
        .iter()
        .find(|url| is_product_url(url))
        .or_else(|| links.first())
        .cloned()
}

fn card_price(card: ElementRef) -> Option<String> {
    for css in PRICE_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };
        for el in card.select(&selector) {
            // Sale prices show the old price struck through; keep the current one
            let text = selector_text(el, "ins").unwrap_or_else(|| element_text(el));
            if text.chars().any(|c| c.is_ascii_digit()) {
                return Some(text);
            }
        }
    }
    None
}

fn card_sku(card: ElementRef) -> Option<String> {
    if let Some(sku) = first_text(card, SKU_SELECTORS).filter(|s| !is_placeholder(s)) {
        return Some(sku);
    }

    SKU_ATTRIBUTES.iter().find_map(|attr| {
        let own = card.value().attr(attr);
        let nested = selector(&format!("[{}]", attr))
            .and_then(|s| card.select(&s).find_map(|el| el.value().attr(attr)));
        own.or(nested)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn card_stock(card: ElementRef) -> Option<String> {
    if let Some(stock) = first_text(card, STOCK_SELECTORS) {
        return Some(stock);
    }

    card.value().classes().find_map(|class| match class {
        "instock" => Some("In stock".to_string()),
        "outofstock" => Some("Out of stock".to_string()),
        "onbackorder" => Some("On backorder".to_string()),
        _ => None,
    })
}

/// Links that follow a heading containing `label`
///
/// The heading's following siblings are searched first, then the
/// siblings following its parent.
fn links_after_heading<'a>(html: &'a Html, label: &str) -> Vec<ElementRef<'a>> {
    let (Some(headings), Some(anchor)) = (selector(HEADING_SELECTOR), selector("a[href]")) else {
        return Vec::new();
    };

    for heading in html.select(&headings) {
        let text = element_text(heading).to_lowercase();
        if text.len() > 80 || !text.contains(label) {
            continue;
        }

        let mut links = following_links(heading, &anchor);
        if links.is_empty() {
            if let Some(parent) = heading.parent().and_then(ElementRef::wrap) {
                links = following_links(parent, &anchor);
            }
        }
        if !links.is_empty() {
            return links;
        }
    }

    Vec::new()
}

fn following_links<'a>(element: ElementRef<'a>, anchor: &Selector) -> Vec<ElementRef<'a>> {
    let mut links = Vec::new();
    for sibling in element.next_siblings().filter_map(ElementRef::wrap) {
        if sibling.value().name() == "a" && sibling.value().attr("href").is_some() {
            links.push(sibling);
        }
        links.extend(sibling.select(anchor));
    }
    links
}

fn hints_from(links: Vec<ElementRef>, base: &Url, parent_id: Option<&str>) -> Vec<CategoryHint> {
    let mut seen = HashSet::new();
    let mut hints = Vec::new();

    for link in links {
        let Some(url) = link.value().attr("href").and_then(|href| resolve_link(href, base)) else {
            continue;
        };
        if !url.as_str().contains("category") {
            continue;
        }

        let name = clean_category_name(&element_text(link));
        if name.is_empty() {
            continue;
        }

        let category_id = category_id_for(&name, Some(&url));
        if Some(category_id.as_str()) == parent_id || !seen.insert(category_id.clone()) {
            continue;
        }

        hints.push(CategoryHint {
            name,
            url,
            category_id,
        });
    }

    hints
}

fn is_product_url(url: &Url) -> bool {
    let path = url.path();
    path.contains("product")
        && !path.contains("product-category")
        && !url.as_str().contains("add-to-cart")
}

fn image_source(img: ElementRef, base: &Url) -> Option<String> {
    let src = img
        .value()
        .attr("src")
        .filter(|src| !src.trim().is_empty() && !src.starts_with("data:"))
        .or_else(|| img.value().attr("data-src"))?;
    resolve_link(src, base).map(String::from)
}

fn meta_content(html: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    html.select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

/// Joins the list items of a WooCommerce short description with " | "
fn short_description_items(root: ElementRef) -> Option<String> {
    let selector = selector(".woocommerce-product-details__short-description li")?;
    let items: Vec<String> = root
        .select(&selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    (!items.is_empty()).then(|| items.join(" | "))
}

/// Value written after a "Label:" text node, on the same node or the next one
fn labelled_value(root: ElementRef, label: &str) -> Option<String> {
    let prefix = format!("{}:", label);
    let mut nodes = root.text().map(str::trim).filter(|t| !t.is_empty());

    while let Some(node) = nodes.next() {
        let Some(rest) = node
            .get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(&prefix))
            .and_then(|_| node.get(prefix.len()..))
        else {
            continue;
        };
        let rest = rest.trim();
        let value = if rest.is_empty() {
            nodes.next().map(str::to_string)
        } else {
            Some(rest.to_string())
        };
        return value.filter(|v| !is_placeholder(v));
    }

    None
}

fn first_text(scope: ElementRef, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = selector(css)?;
        scope
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn selector_text(scope: ElementRef, css: &str) -> Option<String> {
    let selector = selector(css)?;
    scope
        .select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips a trailing product count such as "Dairy (24)"
fn clean_category_name(name: &str) -> String {
    let name = name.trim();
    if let Some(open) = name.rfind('(') {
        let tail = &name[open..];
        let count = tail
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .map(str::trim);
        if count.map_or(false, |count| count.chars().all(|c| c.is_ascii_digit())) {
            return name[..open].trim().to_string();
        }
    }
    name.to_string()
}

/// Total from a result count line
///
/// "Showing 1–16 of 48 results" → 48, "Showing all 7 results" → 7,
/// "Showing the single result" → 1
fn parse_result_count(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    if lower.contains("single result") {
        return Some(1);
    }

    lower
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .last()
        .and_then(|run| run.parse().ok())
}

fn is_placeholder(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "" | "n/a" | "na" | "-")
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}
