//! In-memory `PageFetcher` for unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use super::fetcher::{Document, FetchError, PageFetcher};

/// Serves canned pages by exact URL and records every request
///
/// Unknown URLs answer with HTTP 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(
            url.to_string(),
            Err(FetchError::Http {
                url: url.to_string(),
                status,
            }),
        );
        self
    }

    /// URLs requested so far, in request order
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url, _render_js: bool) -> Result<Document, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());

        match self.pages.get(url.as_str()) {
            Some(Ok(body)) => Ok(Document::new(url.clone(), 200, body.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
