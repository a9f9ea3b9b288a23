//! In-process cache backend on moka.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::notification::RemovalCause;

use super::{Cache, Error};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self, _key: &String, entry: &Entry, _updated_at: Instant, _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local cache. Expired entries read as absent and are evicted
/// during moka's housekeeping or by [`Cache::purge_expired`].
#[derive(Clone)]
pub struct MemoryCache {
    entries: moka::future::Cache<String, Entry>,
    expired: Arc<AtomicU64>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        let expired = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&expired);
        let entries = moka::future::Cache::builder()
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _entry, cause| {
                if cause == RemovalCause::Expired {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self { entries, expired }
    }

    /// Number of live entries, after applying pending evictions.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.entries
            .insert(key.to_string(), Entry { value: value.to_string(), ttl })
            .await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    /// Evict expired entries, returning how many expired since the last purge.
    async fn purge_expired(&self) -> Result<u64, Error> {
        self.entries.run_pending_tasks().await;
        Ok(self.expired.swap(0, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        cache.delete("k").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
        cache.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite() {
        let cache = MemoryCache::new();
        cache.set("k", "old", Duration::from_secs(60)).await.unwrap();
        cache.set("k", "new", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_per_key_expiry() {
        let cache = MemoryCache::new();
        cache.set("short", "v", Duration::from_millis(20)).await.unwrap();
        cache.set("long", "v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("short").await.unwrap().is_none());
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_takes_new_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", "v1", Duration::from_secs(60)).await.unwrap();
        cache.set("k", "v2", Duration::from_millis(20)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set("a", "v", Duration::from_millis(10)).await.unwrap();
        cache.set("b", "v", Duration::from_millis(10)).await.unwrap();
        cache.set("c", "v", Duration::from_secs(60)).await.unwrap();

        // Eviction runs off moka's timer wheel, which ticks at about one second.
        tokio::time::sleep(Duration::from_millis(1_200)).await;

        assert_eq!(cache.purge_expired().await.unwrap(), 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.purge_expired().await.unwrap(), 0);
    }
}
