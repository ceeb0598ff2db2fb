//! Robots.txt policy built on the robotstxt crate's matcher

use std::time::Duration;

use robotstxt::DefaultMatcher;

/// Longest crawl delay honored; larger values are capped to this
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(300);

/// Parsed robots.txt data for one origin
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt body (empty means allow all)
    body: String,
}

impl RobotsPolicy {
    /// Creates a policy from a robots.txt body
    pub fn from_body(body: &str) -> Self {
        Self {
            body: body.to_string(),
        }
    }

    /// Creates a permissive policy
    ///
    /// Used when an origin has no robots.txt or it could not be fetched.
    pub fn allow_all() -> Self {
        Self {
            body: String::new(),
        }
    }

    /// Checks if a path is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `path` - The URL path to check (e.g., "/product-category/shoes/")
    /// * `user_agent` - The crawler name
    pub fn allows(&self, path: &str, user_agent: &str) -> bool {
        if self.body.trim().is_empty() {
            return true;
        }

        // The matcher wants a full URL; only the path part is compared
        let url = format!("http://robots.invalid{}", path);
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, user_agent, &url)
    }

    /// Gets the `Crawl-delay` that applies to `user_agent`
    ///
    /// A group naming the agent takes precedence over the `*` group.
    /// Fractional seconds are honored; delays above `MAX_CRAWL_DELAY` are
    /// capped.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = user_agent.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive user-agent lines share one group
                if !in_agent_lines {
                    group.clear();
                }
                group.push(value.to_lowercase());
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(seconds) = value.parse::<f64>() else {
                continue;
            };
            if !seconds.is_finite() || seconds < 0.0 {
                continue;
            }

            if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                for_agent = Some(seconds);
            } else if group.iter().any(|ua| ua == "*") {
                for_wildcard = Some(seconds);
            }
        }

        for_agent.or(for_wildcard).map(|seconds| {
            Duration::try_from_secs_f64(seconds)
                .unwrap_or(MAX_CRAWL_DELAY)
                .min(MAX_CRAWL_DELAY)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = RobotsPolicy::allow_all();
        assert!(robots.allows("/any/path", "catalog-mapper"));
        assert_eq!(robots.crawl_delay("catalog-mapper"), None);
    }

    #[test]
    fn test_disallow_specific() {
        let robots = RobotsPolicy::from_body("User-agent: *\nDisallow: /my-account\n");
        assert!(robots.allows("/product-category/shoes/", "catalog-mapper"));
        assert!(!robots.allows("/my-account", "catalog-mapper"));
        assert!(!robots.allows("/my-account/orders", "catalog-mapper"));
    }

    #[test]
    fn test_specific_user_agent() {
        let robots = RobotsPolicy::from_body(
            "User-agent: catalog-mapper\nDisallow: /\n\nUser-agent: *\nAllow: /\n",
        );
        assert!(!robots.allows("/shop/", "catalog-mapper"));
        assert!(robots.allows("/shop/", "other-bot"));
    }

    #[test]
    fn test_crawl_delay_wildcard_and_specific() {
        let robots = RobotsPolicy::from_body(
            "User-agent: catalog-mapper\nCrawl-delay: 5\n\nUser-agent: *\nCrawl-delay: 10\n",
        );
        assert_eq!(robots.crawl_delay("catalog-mapper"), Some(Duration::from_secs(5)));
        assert_eq!(robots.crawl_delay("other-bot"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_crawl_delay_after_disallow_in_same_group() {
        let robots = RobotsPolicy::from_body("User-agent: *\nDisallow: /cart/\nCrawl-delay: 2.5\n");
        assert_eq!(robots.crawl_delay("catalog-mapper"), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let robots = RobotsPolicy::from_body(
            "User-agent: BotA\nUser-agent: catalog-mapper\nCrawl-delay: 3\n",
        );
        assert_eq!(robots.crawl_delay("catalog-mapper"), Some(Duration::from_secs(3)));
        assert_eq!(robots.crawl_delay("other-bot"), None);
    }

    #[test]
    fn test_crawl_delay_garbage_ignored() {
        let robots = RobotsPolicy::from_body("User-agent: *\nCrawl-delay: soon\n");
        assert_eq!(robots.crawl_delay("catalog-mapper"), None);
    }

    #[test]
    fn test_crawl_delay_capped() {
        let huge = RobotsPolicy::from_body("User-agent: *\nCrawl-delay: 1e30\n");
        assert_eq!(huge.crawl_delay("catalog-mapper"), Some(MAX_CRAWL_DELAY));

        let long = RobotsPolicy::from_body("User-agent: *\nCrawl-delay: 3600\n");
        assert_eq!(long.crawl_delay("catalog-mapper"), Some(MAX_CRAWL_DELAY));
    }
}
