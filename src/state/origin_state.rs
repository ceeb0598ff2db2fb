use std::time::{Duration, Instant};

use crate::robots::RobotsPolicy;

/// Tracks the state of one origin (scheme, host and port) during a run
///
/// This structure holds what the scheduler needs to pace requests to the
/// origin and, when robots support is on, the origin's robots.txt policy.
#[derive(Debug, Clone)]
pub struct OriginState {
    /// Number of requests made to this origin in the current run
    pub request_count: u32,

    /// Timestamp of the last request to this origin
    pub last_request_time: Option<Instant>,

    /// Minimum time between two requests to this origin
    pub crawl_delay: Duration,

    /// Robots.txt policy, `None` until it has been looked up
    pub robots: Option<RobotsPolicy>,
}

impl OriginState {
    /// Creates a new OriginState paced at `crawl_delay`
    pub fn new(crawl_delay: Duration) -> Self {
        Self {
            request_count: 0,
            last_request_time: None,
            crawl_delay,
            robots: None,
        }
    }

    /// Records that a request was made to this origin
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.crawl_delay {
            Some(self.crawl_delay - elapsed)
        } else {
            None
        }
    }

    /// Installs the origin's robots.txt policy
    ///
    /// A `Crawl-delay` longer than the configured delay raises the pacing
    /// for this origin; a shorter one is ignored.
    pub fn apply_robots(&mut self, policy: RobotsPolicy, user_agent: &str) {
        if let Some(delay) = policy.crawl_delay(user_agent) {
            if delay > self.crawl_delay {
                tracing::info!(
                    "robots.txt Crawl-delay raises pacing to {}ms",
                    delay.as_millis()
                );
                self.crawl_delay = delay;
            }
        }
        self.robots = Some(policy);
    }

    /// Whether `path` may be fetched under the installed robots.txt policy
    ///
    /// Always true while no policy has been installed.
    pub fn allows(&self, path: &str, user_agent: &str) -> bool {
        self.robots
            .as_ref()
            .map_or(true, |robots| robots.allows(path, user_agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_origin_state() {
        let state = OriginState::new(Duration::from_millis(1000));
        assert_eq!(state.request_count, 0);
        assert!(state.last_request_time.is_none());
        assert!(state.robots.is_none());
        assert!(state.time_until_next_request(Instant::now()).is_none());
    }

    #[test]
    fn test_cannot_request_too_soon() {
        let mut state = OriginState::new(Duration::from_millis(1000));
        let now = Instant::now();
        state.record_request(now);

        assert!(state.time_until_next_request(now).is_some());
        assert!(state.time_until_next_request(now + Duration::from_millis(500)).is_some());
        assert!(state.time_until_next_request(now + Duration::from_millis(1100)).is_none());
    }

    #[test]
    fn test_time_until_next_request() {
        let mut state = OriginState::new(Duration::from_millis(1000));
        let now = Instant::now();

        assert!(state.time_until_next_request(now).is_none());

        state.record_request(now);
        assert_eq!(
            state.time_until_next_request(now),
            Some(Duration::from_millis(1000))
        );
        assert_eq!(
            state.time_until_next_request(now + Duration::from_millis(400)),
            Some(Duration::from_millis(600))
        );
        assert!(state
            .time_until_next_request(now + Duration::from_millis(1000))
            .is_none());
    }

    #[test]
    fn test_record_request_counts() {
        let mut state = OriginState::new(Duration::ZERO);
        let now = Instant::now();
        state.record_request(now);
        state.record_request(now);
        assert_eq!(state.request_count, 2);
        assert_eq!(state.last_request_time, Some(now));
    }

    #[test]
    fn test_robots_crawl_delay_raises_pacing() {
        let mut state = OriginState::new(Duration::from_millis(500));
        let policy = RobotsPolicy::from_body("User-agent: *\nCrawl-delay: 2\nDisallow: /cart/\n");
        state.apply_robots(policy, "catalog-mapper");

        assert_eq!(state.crawl_delay, Duration::from_secs(2));
        assert!(!state.allows("/cart/", "catalog-mapper"));
        assert!(state.allows("/product-category/shoes/", "catalog-mapper"));
    }

    #[test]
    fn test_robots_crawl_delay_never_lowers_pacing() {
        let mut state = OriginState::new(Duration::from_millis(3000));
        state.apply_robots(
            RobotsPolicy::from_body("User-agent: *\nCrawl-delay: 1\n"),
            "catalog-mapper",
        );
        assert_eq!(state.crawl_delay, Duration::from_millis(3000));
    }
}
