use crate::cache::{CacheStats, ResponseMemo};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed memo. `ConnectionManager` is `Arc`-based internally, so each
/// call clones it instead of locking.
pub struct RedisMemo {
    connection: ConnectionManager,
}

impl RedisMemo {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(RedisMemo { connection })
    }
}

#[async_trait]
impl ResponseMemo for RedisMemo {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<Option<String>> = conn.get(key).await;

        match result {
            Ok(Some(json)) => {
                tracing::debug!("Redis memo hit: {}", key);
                Some(json)
            }
            Ok(None) => {
                tracing::debug!("Redis memo miss: {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Redis error reading {}: {}", key, e);
                None
            }
        }
    }

    async fn put_raw(&self, key: &str, value: String, ttl: Duration) {
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> = conn.set_ex(key, value, ttl_secs).await;

        match result {
            Ok(()) => tracing::debug!("Redis memo stored with TTL {}s: {}", ttl_secs, key),
            Err(e) => tracing::warn!("Failed to store memo entry {}: {}", key, e),
        }
    }

    async fn get_stats(&self) -> CacheStats {
        let mut conn = self.connection.clone();
        let info: redis::RedisResult<String> =
            redis::cmd("INFO").arg("stats").query_async(&mut conn).await;

        match info {
            Ok(info_str) => CacheStats::from_counts(
                parse_info_value(&info_str, "keyspace_hits"),
                parse_info_value(&info_str, "keyspace_misses"),
                true,
            ),
            Err(_) => CacheStats::from_counts(0, 0, false),
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

fn parse_info_value(info: &str, key: &str) -> u64 {
    info.lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(0)
}
