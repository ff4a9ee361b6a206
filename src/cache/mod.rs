pub mod memory;
pub mod redis;

use crate::models::{BoundingBox, Coordinate};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use memory::MemoryMemo;
pub use redis::RedisMemo;

/// Short-lived memo for upstream lookups (geocoding, traffic flow and incidents).
/// Each entry carries its own TTL. Misses and backend errors look the same to
/// callers: the lookup is simply repeated upstream.
#[async_trait]
pub trait ResponseMemo: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<String>;
    async fn put_raw(&self, key: &str, value: String, ttl: Duration);
    async fn get_stats(&self) -> CacheStats;
    async fn health_check(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

pub async fn get_json<T: DeserializeOwned>(memo: &dyn ResponseMemo, key: &str) -> Option<T> {
    let raw = memo.get_raw(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to deserialize memo entry {}: {}", key, e);
            None
        }
    }
}

/// Backend write failures are absorbed by the memo; only serialization errors
/// come back.
pub async fn put_json<T: Serialize + ?Sized>(
    memo: &dyn ResponseMemo,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string(value)?;
    memo.put_raw(key, json, ttl).await;
    Ok(())
}

/// Key for a geocoding search. The bias point is rounded to 2 decimals (~1 km)
/// since the viewbox spans a full degree anyway.
pub fn geocode_memo_key(query: &str, near: Option<Coordinate>) -> String {
    let query = query.trim().to_lowercase();
    match near {
        Some(c) => format!("geocode:{}@{}", query, c.key_fragment(2)),
        None => format!("geocode:{}", query),
    }
}

/// Key for a traffic-flow sample, rounded to 3 decimals (~100 m).
pub fn flow_memo_key(point: Coordinate) -> String {
    format!("flow:{}", point.key_fragment(3))
}

/// Key for an incident list. Callers round the box first.
pub fn incident_memo_key(bbox: &BoundingBox) -> String {
    format!(
        "incidents:{:.2},{:.2}-{:.2},{:.2}",
        bbox.min_lat, bbox.min_lng, bbox.max_lat, bbox.max_lng
    )
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub connected: bool,
}

impl CacheStats {
    pub(crate) fn from_counts(hits: u64, misses: u64, connected: bool) -> Self {
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocode_key_normalizes_query() {
        let a = geocode_memo_key("  Amsterdam Centraal ", None);
        let b = geocode_memo_key("amsterdam centraal", None);
        assert_eq!(a, b);
        assert_eq!(a, "geocode:amsterdam centraal");
    }

    #[test]
    fn test_geocode_key_buckets_bias_point() {
        let near1 = Coordinate::new(52.3712, 4.8991).unwrap();
        let near2 = Coordinate::new(52.3688, 4.9012).unwrap();
        assert_eq!(
            geocode_memo_key("dam", Some(near1)),
            geocode_memo_key("dam", Some(near2))
        );
        assert_ne!(geocode_memo_key("dam", Some(near1)), geocode_memo_key("dam", None));
    }

    #[test]
    fn test_flow_key() {
        let point = Coordinate::new(52.36761, 4.90412).unwrap();
        assert_eq!(flow_memo_key(point), "flow:52.368,4.904");
    }

    #[test]
    fn test_incident_key_shared_by_nearby_boxes() {
        let a: BoundingBox = "4.8512,52.3376,4.9041,52.3999".parse().unwrap();
        let b: BoundingBox = "4.8590,52.3301,4.9002,52.3950".parse().unwrap();
        let key = incident_memo_key(&a.rounded_out(2));
        assert_eq!(key, incident_memo_key(&b.rounded_out(2)));
        assert_eq!(key, "incidents:52.33,4.85-52.40,4.91");
    }

    #[test]
    fn test_stats_hit_rate() {
        let stats = CacheStats::from_counts(1, 3, true);
        assert_eq!(stats.hit_rate, 25.0);
        assert_eq!(CacheStats::from_counts(0, 0, false).hit_rate, 0.0);
    }
}
