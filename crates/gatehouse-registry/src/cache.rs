use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Cached upstream tool lists keyed by server slug
///
/// Entries age but are never evicted: when a refresh fails the stale
/// list keeps serving lookups, which beats forgetting a server's
/// tools because it had a bad minute. Freshness is the proxy layer's
/// cue to refresh, not a validity bound.
pub struct ToolCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedTools>>,
}

struct CachedTools {
    tools: Vec<Value>,
    fetched_at: Instant,
}

impl ToolCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached tools for a server, fresh or stale
    pub fn get(&self, slug: &str) -> Option<Vec<Value>> {
        let entries = self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(slug).map(|c| c.tools.clone())
    }

    /// Whether the cached entry is within its freshness window
    pub fn is_fresh(&self, slug: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .get(slug)
            .is_some_and(|c| c.fetched_at.elapsed() < self.ttl)
    }

    /// Replace a server's tool list and restart its freshness window
    pub fn store(&self, slug: &str, tools: Vec<Value>) {
        let mut entries = self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(
            slug.to_string(),
            CachedTools {
                tools,
                fetched_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = ToolCache::new(Duration::from_secs(300));
        assert!(cache.get("filesys").is_none());
        assert!(!cache.is_fresh("filesys"));

        cache.store("filesys", vec![json!({"name": "read"})]);
        assert_eq!(cache.get("filesys").unwrap().len(), 1);
        assert!(cache.is_fresh("filesys"));
    }

    #[test]
    fn stale_entries_still_serve_lookups() {
        let cache = ToolCache::new(Duration::ZERO);
        cache.store("filesys", vec![json!({"name": "read"})]);

        assert!(!cache.is_fresh("filesys"));
        assert!(cache.get("filesys").is_some());
    }
}
