use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use super::limit::RateLimit;

/// A limit bound to the scope it counts in ("global", "/ocr", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedLimit<'a> {
    pub scope: &'a str,
    pub limit: RateLimit,
}

/// The limit that rejected a request and how long until it frees a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitExceeded {
    pub limit: RateLimit,
    pub retry_after: Duration,
}

/// Backing storage for sliding-window counters.
///
/// `acquire` must be atomic per call: a request either counts against every
/// limit it names or against none of them. The in-memory store only works
/// inside one process; a deployment with several instances needs a shared
/// implementation.
pub trait CounterStore: Send + Sync {
    fn acquire(
        &self,
        client: &str,
        limits: &[ScopedLimit<'_>],
        now: Instant,
    ) -> Result<(), LimitExceeded>;

    /// Drops hits older than `max_window`. Returns the number of counters removed.
    fn purge_expired(&self, now: Instant, max_window: Duration) -> usize;
}

/// Sliding-window log per (scope, limit, client), all behind one mutex.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(scope: &str, limit: &RateLimit, client: &str) -> String {
        format!("{scope}/{limit}:{client}")
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

fn evict_before(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.saturating_duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

impl CounterStore for InMemoryCounterStore {
    fn acquire(
        &self,
        client: &str,
        limits: &[ScopedLimit<'_>],
        now: Instant,
    ) -> Result<(), LimitExceeded> {
        // A poisoned lock only means another request panicked mid-update;
        // the counters themselves are still usable.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let keys: Vec<String> = limits
            .iter()
            .map(|scoped| Self::key(scoped.scope, &scoped.limit, client))
            .collect();

        for (scoped, key) in limits.iter().zip(&keys) {
            let window = scoped.limit.window();
            let hits = windows.entry(key.clone()).or_default();
            evict_before(hits, now, window);

            if hits.len() >= scoped.limit.amount() as usize {
                let retry_after = hits
                    .front()
                    .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                    .unwrap_or(window);
                debug!(key = %key, hits = hits.len(), "Rate limit check: denied");
                return Err(LimitExceeded {
                    limit: scoped.limit,
                    retry_after,
                });
            }
        }

        for key in keys {
            let hits = windows.entry(key).or_default();
            hits.push_back(now);
            debug!(client, hits = hits.len(), "Rate limit check: allowed");
        }

        Ok(())
    }

    fn purge_expired(&self, now: Instant, max_window: Duration) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = windows.len();
        windows.retain(|_, hits| {
            evict_before(hits, now, max_window);
            !hits.is_empty()
        });
        before - windows.len()
    }
}
