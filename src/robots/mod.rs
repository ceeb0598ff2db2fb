//! Robots.txt handling module
//!
//! Robots support is opt-in (`respect-robots-txt`). When enabled the
//! scheduler looks up each origin's robots.txt once, refuses disallowed
//! paths, and paces the origin at the longer of the configured delay and
//! the file's `Crawl-delay`.

mod policy;

pub use policy::{RobotsPolicy, MAX_CRAWL_DELAY};

use url::Url;

/// Location of the robots.txt file governing `url`
///
/// # Examples
///
/// ```
/// use catalog_mapper::robots::robots_url;
/// use url::Url;
///
/// let page = Url::parse("https://shop.example.com:8443/product/kettle/?x=1").unwrap();
/// assert_eq!(robots_url(&page).unwrap().as_str(), "https://shop.example.com:8443/robots.txt");
/// ```
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Path and query of `url`, the form robots.txt rules are matched against
pub fn robots_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
