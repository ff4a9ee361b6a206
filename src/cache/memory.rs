use crate::cache::{CacheStats, ResponseMemo};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct MemoEntry {
    value: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, MemoEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory memo backed by moka with bounded capacity.
/// All methods are `&self`; moka handles its own synchronization.
pub struct MemoryMemo {
    entries: Cache<String, MemoEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryMemo {
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        MemoryMemo {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ResponseMemo for MemoryMemo {
    async fn get_raw(&self, key: &str) -> Option<String> {
        match self.entries.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Memory memo hit: {}", key);
                Some(entry.value.to_string())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Memory memo miss: {}", key);
                None
            }
        }
    }

    async fn put_raw(&self, key: &str, value: String, ttl: Duration) {
        let entry = MemoEntry {
            value: Arc::from(value),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        tracing::debug!("Memory memo stored with TTL {}s: {}", ttl.as_secs(), key);
    }

    async fn get_stats(&self) -> CacheStats {
        CacheStats::from_counts(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            true,
        )
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
