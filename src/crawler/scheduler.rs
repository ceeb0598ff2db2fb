//! Scheduler for rate limiting every fetch of a run
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-origin minimum delay between requests
//! - Optional robots.txt lookup, path checks and `Crawl-delay`
//!
//! Every fetch the discoverer and harvester make goes through here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use url::Url;

use super::fetcher::{Document, FetchError, PageFetcher};
use crate::config::CrawlerConfig;
use crate::robots::{robots_path, robots_url, RobotsPolicy};
use crate::state::OriginState;
use crate::url::origin_key;

/// Rate-limited front of a `PageFetcher`
pub struct Scheduler {
    fetcher: Arc<dyn PageFetcher>,

    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// Per-origin pacing and robots state
    origins: Mutex<HashMap<String, OriginState>>,

    minimum_delay: Duration,

    respect_robots: bool,

    /// Agent name matched against robots.txt groups
    robots_agent: String,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Where pages actually come from
    /// * `config` - Concurrency, delay and robots settings
    /// * `robots_agent` - Crawler name used for robots.txt matching
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &CrawlerConfig, robots_agent: &str) -> Self {
        Self {
            fetcher,
            global_semaphore: Arc::new(Semaphore::new(
                config.max_concurrent_requests.max(1) as usize,
            )),
            origins: Mutex::new(HashMap::new()),
            minimum_delay: Duration::from_millis(config.minimum_delay),
            respect_robots: config.respect_robots_txt,
            robots_agent: robots_agent.to_string(),
        }
    }

    /// Fetches `url` once a permit is free and its origin is ready
    pub async fn fetch(&self, url: &Url, render_js: bool) -> Result<Document, FetchError> {
        let _permit = self
            .global_semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Throttle { url: url.to_string() })?;

        let origin = origin_key(url);

        if self.respect_robots {
            self.ensure_robots(&origin, url).await;
            if !self.robots_allows(&origin, url).await {
                tracing::info!("robots.txt disallows {}", url);
                return Err(FetchError::RobotsDenied { url: url.to_string() });
            }
        }

        self.wait_for_turn(&origin).await;
        tracing::debug!("Fetching {}", url);
        self.fetcher.fetch(url, render_js).await
    }

    /// Total requests made through this scheduler, robots.txt included
    pub async fn requests_made(&self) -> u32 {
        self.origins
            .lock()
            .await
            .values()
            .map(|state| state.request_count)
            .sum()
    }

    /// Waits until `origin` accepts a request, then books the slot
    ///
    /// Checking and booking happen under one lock, so concurrent callers
    /// for the same origin are spaced by the full delay.
    async fn wait_for_turn(&self, origin: &str) {
        loop {
            let wait = {
                let mut origins = self.origins.lock().await;
                let state = origins
                    .entry(origin.to_string())
                    .or_insert_with(|| OriginState::new(self.minimum_delay));

                let now = Instant::now();
                match state.time_until_next_request(now) {
                    None => {
                        state.record_request(now);
                        return;
                    }
                    Some(wait) => wait,
                }
            };

            tracing::trace!("Waiting {:?} for {}", wait, origin);
            tokio::time::sleep(wait).await;
        }
    }

    /// Looks up robots.txt for `origin` the first time it is seen
    ///
    /// An unreachable or missing robots.txt allows everything.
    async fn ensure_robots(&self, origin: &str, url: &Url) {
        {
            let origins = self.origins.lock().await;
            if origins.get(origin).map_or(false, |s| s.robots.is_some()) {
                return;
            }
        }

        let policy = match robots_url(url) {
            Some(robots) => {
                self.wait_for_turn(origin).await;
                match self.fetcher.fetch(&robots, false).await {
                    Ok(doc) => RobotsPolicy::from_body(&doc.body),
                    Err(e) => {
                        tracing::debug!("No usable robots.txt for {}: {}", origin, e);
                        RobotsPolicy::allow_all()
                    }
                }
            }
            None => RobotsPolicy::allow_all(),
        };

        let mut origins = self.origins.lock().await;
        let state = origins
            .entry(origin.to_string())
            .or_insert_with(|| OriginState::new(self.minimum_delay));
        if state.robots.is_none() {
            state.apply_robots(policy, &self.robots_agent);
        }
    }

    async fn robots_allows(&self, origin: &str, url: &Url) -> bool {
        let origins = self.origins.lock().await;
        origins
            .get(origin)
            .map_or(true, |state| state.allows(&robots_path(url), &self.robots_agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::StaticFetcher;

    fn config(delay_ms: u64, robots: bool) -> CrawlerConfig {
        CrawlerConfig {
            max_concurrent_requests: 2,
            minimum_delay: delay_ms,
            respect_robots_txt: robots,
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_enforces_per_origin_delay() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page("https://shop.example/a", "<p>a</p>")
                .page("https://shop.example/b", "<p>b</p>"),
        );
        let scheduler = Scheduler::new(fetcher, &config(150, false), "catalog-mapper");

        let start = Instant::now();
        let a = Url::parse("https://shop.example/a").unwrap();
        let b = Url::parse("https://shop.example/b").unwrap();
        let (first, second) = tokio::join!(scheduler.fetch(&a, false), scheduler.fetch(&b, false));

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert_eq!(scheduler.requests_made().await, 2);
    }

    #[tokio::test]
    async fn test_origins_paced_independently() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page("https://shop.example/a", "<p>a</p>")
                .page("https://other.example/b", "<p>b</p>"),
        );
        let scheduler = Scheduler::new(fetcher, &config(2_000, false), "catalog-mapper");

        let start = Instant::now();
        let a = Url::parse("https://shop.example/a").unwrap();
        let b = Url::parse("https://other.example/b").unwrap();
        let (first, second) = tokio::join!(scheduler.fetch(&a, false), scheduler.fetch(&b, false));

        assert!(first.is_ok() && second.is_ok());
        assert!(start.elapsed() < Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn test_robots_denied() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page("https://shop.example/robots.txt", "User-agent: *\nDisallow: /my-account/\n")
                .page("https://shop.example/my-account/", "<p>secret</p>")
                .page("https://shop.example/shop/", "<p>shop</p>"),
        );
        let scheduler = Scheduler::new(fetcher.clone(), &config(0, true), "catalog-mapper");

        let denied = Url::parse("https://shop.example/my-account/").unwrap();
        let allowed = Url::parse("https://shop.example/shop/").unwrap();

        assert!(matches!(
            scheduler.fetch(&denied, false).await,
            Err(FetchError::RobotsDenied { .. })
        ));
        assert!(scheduler.fetch(&allowed, false).await.is_ok());

        // robots.txt is looked up once per origin
        let requested = fetcher.requested();
        assert_eq!(requested.iter().filter(|u| u.ends_with("/robots.txt")).count(), 1);
        assert!(!requested.contains(&"https://shop.example/my-account/".to_string()));
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let fetcher =
            Arc::new(StaticFetcher::new().page("https://shop.example/shop/", "<p>shop</p>"));
        let scheduler = Scheduler::new(fetcher, &config(0, true), "catalog-mapper");

        let url = Url::parse("https://shop.example/shop/").unwrap();
        assert!(scheduler.fetch(&url, false).await.is_ok());
    }
}
