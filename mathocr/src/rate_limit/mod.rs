//! Per-client request limiting.
//!
//! Limits are sliding windows counted per client address. Every non-exempt
//! route shares the default limits; individual routes can add their own
//! tighter limits on top. Counters live behind [`CounterStore`] so the
//! in-memory map can be swapped for shared storage.

mod limit;
mod store;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use limit::{ParseRateLimitError, RateLimit, RateLimitSet};
pub use store::{CounterStore, InMemoryCounterStore, LimitExceeded, ScopedLimit};

use crate::config::RateLimitConfig;

const GLOBAL_SCOPE: &str = "global";

#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    default_limits: RateLimitSet,
    route_limits: Arc<HashMap<String, RateLimitSet>>,
    exempt: Arc<HashSet<String>>,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryCounterStore::new()))
    }

    pub fn with_store(config: &RateLimitConfig, store: Arc<dyn CounterStore>) -> Self {
        let mut route_limits = HashMap::new();
        route_limits.insert("/ocr".to_string(), config.ocr_limits.clone());

        let exempt = ["/health", "/openapi.json"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            enabled: config.enabled,
            default_limits: config.default_limits.clone(),
            route_limits: Arc::new(route_limits),
            exempt: Arc::new(exempt),
            store,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Counts one request from `client` against `route`.
    ///
    /// `route` is the matched route template, `None` for unmatched paths
    /// (which only count against the default limits).
    pub fn check(&self, client: &str, route: Option<&str>) -> Result<(), LimitExceeded> {
        self.check_at(client, route, Instant::now())
    }

    pub fn check_at(
        &self,
        client: &str,
        route: Option<&str>,
        now: Instant,
    ) -> Result<(), LimitExceeded> {
        if !self.enabled {
            return Ok(());
        }
        if route.is_some_and(|r| self.exempt.contains(r)) {
            return Ok(());
        }

        let mut limits: Vec<ScopedLimit<'_>> = self
            .default_limits
            .limits()
            .iter()
            .map(|limit| ScopedLimit {
                scope: GLOBAL_SCOPE,
                limit: *limit,
            })
            .collect();

        if let Some((scope, set)) = route.and_then(|r| self.route_limits.get_key_value(r)) {
            limits.extend(set.limits().iter().map(|limit| ScopedLimit {
                scope: scope.as_str(),
                limit: *limit,
            }));
        }

        if limits.is_empty() {
            return Ok(());
        }

        self.store.acquire(client, &limits, now)
    }

    /// Longest window in use; anything older can be forgotten.
    pub fn longest_window(&self) -> Duration {
        self.route_limits
            .values()
            .filter_map(RateLimitSet::longest_window)
            .chain(self.default_limits.longest_window())
            .max()
            .unwrap_or(Duration::ZERO)
    }

    pub fn purge_expired(&self) -> usize {
        self.store
            .purge_expired(Instant::now(), self.longest_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(default_limits: &str, ocr_limits: &str) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            default_limits: default_limits.parse().unwrap(),
            ocr_limits: ocr_limits.parse().unwrap(),
        }
    }

    #[test]
    fn test_ocr_route_gets_its_own_limit() {
        let limiter = RateLimiter::new(&config("100 per hour", "2 per minute"));
        let now = Instant::now();

        assert!(limiter.check_at("c", Some("/ocr"), now).is_ok());
        assert!(limiter.check_at("c", Some("/ocr"), now).is_ok());
        let denied = limiter.check_at("c", Some("/ocr"), now).unwrap_err();
        assert_eq!(denied.limit, RateLimit::per_minute(2));

        // Other routes only see the default budget.
        assert!(limiter.check_at("c", Some("/"), now).is_ok());
    }

    #[test]
    fn test_default_limits_are_shared_across_routes() {
        let limiter = RateLimiter::new(&config("3 per hour", "30 per minute"));
        let now = Instant::now();

        limiter.check_at("c", Some("/"), now).unwrap();
        limiter.check_at("c", Some("/ocr"), now).unwrap();
        limiter.check_at("c", None, now).unwrap();
        let denied = limiter.check_at("c", Some("/ocr"), now).unwrap_err();
        assert_eq!(denied.limit, RateLimit::per_hour(3));
    }

    #[test]
    fn test_exempt_routes_are_never_counted() {
        let limiter = RateLimiter::new(&config("1 per day", "1 per minute"));
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at("c", Some("/health"), now).is_ok());
        }
        assert!(limiter.check_at("c", Some("/"), now).is_ok());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let mut cfg = config("1 per day", "1 per minute");
        cfg.enabled = false;
        let limiter = RateLimiter::new(&cfg);
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("c", Some("/ocr"), now).is_ok());
        }
    }

    #[test]
    fn test_longest_window() {
        let limiter = RateLimiter::new(&RateLimitConfig::default());
        assert_eq!(limiter.longest_window(), Duration::from_secs(86_400));
    }
}
