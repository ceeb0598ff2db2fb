//! Page fetching
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `PageFetcher` seam the discoverer and harvester fetch through
//! - Building HTTP clients with proper user agent strings
//! - Routing script-rendered fetches through a pre-rendering endpoint
//! - Error classification into `FetchError`

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::{Config, UserAgentConfig};

/// A fetched page
#[derive(Debug, Clone)]
pub struct Document {
    /// The URL that was requested
    pub url: Url,

    /// URL after redirects; relative links resolve against it
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Page body
    pub body: String,
}

impl Document {
    /// Creates a document that was served without redirects
    pub fn new(url: Url, status: u16, body: String) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status,
            body,
        }
    }

    /// Base URL for resolving links found in the body
    pub fn base_url(&self) -> &Url {
        &self.final_url
    }
}

/// Why a fetch failed
///
/// Always recoverable at the seed, page or leaf that issued the fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Unexpected content type '{content_type}' for {url}")]
    ContentMismatch { url: String, content_type: String },

    #[error("robots.txt disallows {url}")]
    RobotsDenied { url: String },

    #[error("Throttled by {url}")]
    Throttle { url: String },
}

/// Fetches pages for the discoverer and the harvester
///
/// `render_js` asks for the page as a browser would show it after
/// scripts ran. Implementations that cannot render return the raw HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, render_js: bool) -> Result<Document, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound on a whole request
///
/// # Example
///
/// ```no_run
/// use catalog_mapper::config::UserAgentConfig;
/// use catalog_mapper::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "CatalogMapper".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageFetcher` over reqwest
pub struct HttpFetcher {
    client: Client,

    /// Pre-rendering service prefix for `render_js` fetches
    renderer_endpoint: Option<String>,

    missing_renderer_logged: AtomicBool,
}

impl HttpFetcher {
    /// Creates a fetcher from the run configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout),
        )?;

        Ok(Self::with_client(client, config.site.renderer_endpoint.clone()))
    }

    pub fn with_client(client: Client, renderer_endpoint: Option<String>) -> Self {
        Self {
            client,
            renderer_endpoint: renderer_endpoint.filter(|e| !e.trim().is_empty()),
            missing_renderer_logged: AtomicBool::new(false),
        }
    }

    /// The URL actually requested for `url`
    ///
    /// With rendering requested and an endpoint configured this is
    /// `<endpoint><percent-encoded url>`; otherwise `url` itself.
    pub fn request_url(&self, url: &Url, render_js: bool) -> String {
        if !render_js {
            return url.to_string();
        }

        match &self.renderer_endpoint {
            Some(endpoint) => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();
                format!("{}{}", endpoint, encoded)
            }
            None => {
                if !self.missing_renderer_logged.swap(true, Ordering::Relaxed) {
                    tracing::debug!("No renderer endpoint configured, fetching raw HTML");
                }
                url.to_string()
            }
        }
    }

    fn rendered(&self, render_js: bool) -> bool {
        render_js && self.renderer_endpoint.is_some()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, render_js: bool) -> Result<Document, FetchError> {
        let target = self.request_url(url, render_js);
        tracing::trace!("GET {}", target);

        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Throttle { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !is_textual(&content_type) {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        // A rendered page stands in for the original URL
        let final_url = if self.rendered(render_js) {
            url.clone()
        } else {
            response.url().clone()
        };

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(Document {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// HTML and other text bodies are accepted; a missing header is trusted
fn is_textual(content_type: &str) -> bool {
    content_type.is_empty() || content_type.contains("html") || content_type.starts_with("text/")
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
