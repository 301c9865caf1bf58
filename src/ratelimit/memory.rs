//! In-process expiring cache backed by DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::cache::{CacheValue, ExpiringCache};

#[derive(Debug, Clone)]
struct Slot {
    value: CacheValue,
    expires_at: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A thread-safe in-memory cache with per-entry expiry.
///
/// Expired entries are dropped lazily on access and in bulk by
/// [`MemoryCache::purge_expired`], which [`MemoryCache::spawn_sweeper`] runs
/// periodically.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Slot>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Spawn a task that purges expired entries every `interval`.
    ///
    /// The task only holds a weak reference and exits once the cache has been
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped, stopping sweeper");
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    trace!(purged, remaining = cache.len(), "Purged expired cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl ExpiringCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<CacheValue> {
        let now = Instant::now();
        if let Some(slot) = self.entries.get(key) {
            if !slot.is_expired(now) {
                return Some(slot.value.clone());
            }
        }
        self.entries.remove_if(key, |_, slot| slot.is_expired(now));
        None
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), Slot { value, expires_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("absent").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        let now = Utc::now();

        cache
            .set("key", CacheValue::Timestamp(now), Duration::from_secs(10))
            .await;

        assert_eq!(cache.get("key").await, Some(CacheValue::Timestamp(now)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = MemoryCache::new();

        cache
            .set("key", CacheValue::Text("first".into()), Duration::from_secs(10))
            .await;
        cache
            .set("key", CacheValue::Text("second".into()), Duration::from_secs(10))
            .await;

        assert_eq!(cache.get("key").await, Some(CacheValue::Text("second".into())));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = MemoryCache::new();

        cache
            .set("key", CacheValue::Bytes(vec![1]), Duration::from_millis(20))
            .await;
        assert!(cache.get("key").await.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get("key").await, None);
        // Lazily removed on access
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_already_expired() {
        let cache = MemoryCache::new();

        cache
            .set("key", CacheValue::Timestamp(Utc::now()), Duration::ZERO)
            .await;

        assert_eq!(cache.get("key").await, None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();

        cache
            .set("short", CacheValue::Text("a".into()), Duration::from_millis(10))
            .await;
        cache
            .set("long", CacheValue::Text("b".into()), Duration::from_secs(10))
            .await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache
            .set("key", CacheValue::Text("a".into()), Duration::from_secs(10))
            .await;

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let cache = Arc::new(MemoryCache::new());
        let sweeper = cache.spawn_sweeper(Duration::from_millis(20));

        cache
            .set("key", CacheValue::Text("a".into()), Duration::from_millis(10))
            .await;
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.len(), 0);

        sweeper.abort();
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_cache_dropped() {
        let cache = Arc::new(MemoryCache::new());
        let sweeper = cache.spawn_sweeper(Duration::from_millis(10));

        drop(cache);

        tokio::time::timeout(Duration::from_secs(1), sweeper)
            .await
            .expect("sweeper should exit after the cache is dropped")
            .unwrap();
    }
}
