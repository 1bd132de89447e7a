//! # Response Cache
//!
//! Short-lived memo of upstream reads, keyed by `(resource, operation)`.
//!
//! One cache belongs to one resource kind's reconciler. Entries older than the TTL read as
//! misses. Writes upstream (Create/Update/Delete) never touch the cache; the next read after
//! expiry re-fetches.

use crate::observability::metrics;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Kind of upstream read being memoised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Name of the managed resource the read was made for
    pub resource: String,
    pub operation: CacheOperation,
}

impl CacheKey {
    pub fn get(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            operation: CacheOperation::Get,
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    payload: V,
    stored_at: Instant,
}

/// TTL cache guarded by a single read-write lock
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
    ttl: Duration,
    kind: &'static str,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(kind: &'static str, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            kind,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for `key`, or `None` when absent or expired
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let entries = self.entries.read().await;
        let hit = entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() <= self.ttl)
            .map(|entry| entry.payload.clone());
        metrics::record_cache_lookup(self.kind, hit.is_some());
        hit
    }

    /// Store `payload` stamped with the current time
    pub async fn set(&self, key: CacheKey, payload: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = ResponseCache::new("Test", Duration::from_secs(30));
        cache.set(CacheKey::get("pool-1"), 7u32).await;
        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get(&CacheKey::get("pool-1")).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_after_ttl() {
        let cache = ResponseCache::new("Test", Duration::from_secs(30));
        cache.set(CacheKey::get("pool-1"), 7u32).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get(&CacheKey::get("pool-1")).await, None);
    }

    #[tokio::test]
    async fn test_entries_are_per_resource() {
        let cache = ResponseCache::new("Test", Duration::from_secs(30));
        cache.set(CacheKey::get("a"), 1u32).await;
        assert_eq!(cache.get(&CacheKey::get("b")).await, None);
        assert_eq!(cache.get(&CacheKey::get("a")).await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_drops_only_expired_entries() {
        let cache = ResponseCache::new("Test", Duration::from_secs(30));
        cache.set(CacheKey::get("old"), 1u32).await;
        tokio::time::advance(Duration::from_secs(20)).await;
        cache.set(CacheKey::get("new"), 2u32).await;
        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&CacheKey::get("new")).await, Some(2));
    }
}
