//! GET response cache
//!
//! Responses are cached by request path. Entries older than the TTL are
//! stale and refetched. Mutations invalidate every entry under the mutated
//! resource's path prefix, so `/documents/d-1` drops `/documents/d-1/blocks`
//! as well.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached value for `path`, if any
    pub fn get(&self, path: &str) -> Option<&serde_json::Value> {
        self.entries
            .get(path)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| &entry.value)
    }

    pub fn insert(&mut self, path: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(
            path.into(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop `prefix` and everything below it; returns how many entries went
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let prefix = prefix.trim_end_matches('/');
        let before = self.entries.len();
        self.entries.retain(|path, _| {
            !(path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?')))
        });
        before - self.entries.len()
    }

    /// Drop entries past their TTL
    pub fn evict_stale(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_entries_go_stale_after_ttl() {
        let mut cache = QueryCache::new(Duration::from_secs(5));
        cache.insert("/documents/d-1", json!({"id": "d-1"}));
        assert!(cache.get("/documents/d-1").is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get("/documents/d-1").is_none());

        cache.evict_stale();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prefix_invalidation_respects_segments() {
        let mut cache = QueryCache::default();
        cache.insert("/documents/d-1", json!({}));
        cache.insert("/documents/d-1/blocks", json!([]));
        cache.insert("/documents/d-10", json!({}));
        cache.insert("/tasks", json!([]));

        assert_eq!(cache.invalidate_prefix("/documents/d-1"), 2);
        assert!(cache.get("/documents/d-10").is_some());
        assert!(cache.get("/tasks").is_some());
        assert_eq!(cache.len(), 2);
    }
}
