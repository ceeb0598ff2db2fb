use serde::Deserialize;

/// Main configuration structure for Catalog-Mapper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-requests", default = "default_concurrency")]
    pub max_concurrent_requests: u32,

    /// Minimum time between requests to the same origin (milliseconds)
    #[serde(rename = "minimum-delay", default = "default_minimum_delay")]
    pub minimum_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Number of homepage product links used as discovery seeds
    #[serde(rename = "max-seed-products", default = "default_max_seed_products")]
    pub max_seed_products: usize,

    /// Upper bound on listing pages visited per leaf
    #[serde(rename = "max-pages-per-leaf", default = "default_max_pages_per_leaf")]
    pub max_pages_per_leaf: usize,

    /// Ask the fetcher for script-rendered pages
    #[serde(rename = "render-js", default = "default_true")]
    pub render_js: bool,

    /// Visit each product's detail page to fill SKU, brand and description
    #[serde(rename = "fetch-product-details", default)]
    pub fetch_product_details: bool,

    /// Consult robots.txt before fetching
    #[serde(rename = "respect-robots-txt", default)]
    pub respect_robots_txt: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_concurrency(),
            minimum_delay: default_minimum_delay(),
            request_timeout: default_request_timeout(),
            max_seed_products: default_max_seed_products(),
            max_pages_per_leaf: default_max_pages_per_leaf(),
            render_js: true,
            fetch_product_details: false,
            respect_robots_txt: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// The shop being mapped
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Homepage (or any listing page) product seeds are collected from
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Explicit product pages to seed discovery with
    #[serde(rename = "seed-products", default)]
    pub seed_products: Vec<String>,

    /// Explicit category listing pages added as top-level categories
    #[serde(rename = "seed-categories", default)]
    pub seed_categories: Vec<String>,

    /// Pre-rendering service; the page URL is appended percent-encoded
    #[serde(rename = "renderer-endpoint", default)]
    pub renderer_endpoint: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the four sink files are written to
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Character set of the text sinks
    #[serde(rename = "text-encoding", default)]
    pub text_encoding: TextEncoding,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            text_encoding: TextEncoding::default(),
        }
    }
}

/// Character set used by the human-readable sinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,

    /// Non-ASCII characters are replaced with `?`
    #[serde(rename = "ascii")]
    Ascii,
}

impl TextEncoding {
    /// Label written into text sink headers
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii (non-ASCII replaced with '?')",
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

fn default_minimum_delay() -> u64 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_seed_products() -> usize {
    10
}

fn default_max_pages_per_leaf() -> usize {
    200
}

fn default_true() -> bool {
    true
}

fn default_output_directory() -> String {
    "data".to_string()
}
