// src/services/cache.rs
// DOCUMENTATION: In-memory cache for rendered map feeds
// PURPOSE: Avoid rebuilding the GeoJSON on every map load; writes invalidate it

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache entry with expiration
#[derive(Clone, Debug)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// TTL cache of serialized feeds keyed by their filter
/// DOCUMENTATION: Shared through web::Data<Arc<FeedCache>>
/// `generation` moves on every invalidation so a feed built before a write
/// is never stored after it
pub struct FeedCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    generation: AtomicU64,
}

impl FeedCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
            generation: AtomicU64::new(0),
        }
    }

    /// Cache key for a map feed filter
    pub fn key(place_type: Option<&str>, specialty: Option<&str>) -> String {
        format!(
            "map:{}:{}",
            place_type.unwrap_or("*"),
            specialty.unwrap_or("*")
        )
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) if !entry.is_expired() => {
                log::debug!("Cache HIT for key: {}", key);
                Some(entry.body.clone())
            }
            Some(_) => {
                log::debug!("Cache EXPIRED for key: {}", key);
                None
            }
            None => {
                log::debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    /// Read before building a feed and pass the value back to `set`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a feed built at `generation`; dropped if a write happened since
    pub async fn set(&self, key: String, body: String, generation: u64) {
        let mut store = self.store.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Cache SET skipped for key: {} (invalidated meanwhile)", key);
            return;
        }
        log::debug!("Cache SET for key: {} (TTL: {}s)", key, self.ttl.as_secs());
        store.insert(
            key,
            CacheEntry {
                body,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop everything; called after any write to the directory
    pub async fn invalidate(&self) {
        let mut store = self.store.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if !store.is_empty() {
            log::debug!("Cache invalidated: {} entries removed", store.len());
        }
        store.clear();
    }

    /// Clear expired entries
    pub async fn cleanup(&self) {
        let mut store = self.store.write().await;
        let before_count = store.len();
        store.retain(|_, entry| !entry.is_expired());
        let after_count = store.len();

        if before_count > after_count {
            log::info!(
                "Cache cleanup: removed {} expired entries ({} remaining)",
                before_count - after_count,
                after_count
            );
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let total = store.len();
        let expired = store.values().filter(|e| e.is_expired()).count();

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }
}

/// Cache statistics
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

/// Start background cleanup task
/// DOCUMENTATION: Periodically removes expired entries
pub fn start_cleanup_task(cache: Arc<FeedCache>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));

        loop {
            interval.tick().await;
            cache.cleanup().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_set_get() {
        let cache = FeedCache::new(60);
        let key = FeedCache::key(Some("auction-house"), None);

        cache.set(key.clone(), "{}".to_string(), cache.generation()).await;
        assert_eq!(cache.get(&key).await, Some("{}".to_string()));
        assert_eq!(cache.get("map:*:*").await, None);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = FeedCache::new(0);
        cache.set("k".to_string(), "v".to_string(), cache.generation()).await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.get("k").await.is_none());
        cache.cleanup().await;
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[test]
    fn test_invalidate_clears_everything() {
        tokio_test::block_on(async {
            let cache = FeedCache::new(60);
            cache.set(FeedCache::key(None, None), "a".to_string(), cache.generation()).await;
            cache
                .set(FeedCache::key(Some("shop"), Some("silver")), "b".to_string(), cache.generation())
                .await;

            cache.invalidate().await;

            let stats = cache.stats().await;
            assert_eq!(stats.total_entries, 0);
            assert_eq!(stats.active_entries, 0);
        });
    }

    #[tokio::test]
    async fn test_feed_built_before_invalidate_is_not_stored() {
        let cache = FeedCache::new(60);
        let key = FeedCache::key(None, None);

        let seen = cache.generation();
        cache.invalidate().await;
        cache.set(key.clone(), "stale".to_string(), seen).await;
        assert!(cache.get(&key).await.is_none());

        cache.set(key.clone(), "fresh".to_string(), cache.generation()).await;
        assert_eq!(cache.get(&key).await, Some("fresh".to_string()));
    }

    #[test]
    fn test_keys_differ_by_filter() {
        assert_ne!(
            FeedCache::key(Some("shop"), None),
            FeedCache::key(None, Some("shop"))
        );
    }
}
