use crate::constants::CACHE_KEY_DECIMALS;
use crate::models::{Coordinate, Route, RoutePreference};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Deterministic cache key for a route request.
/// Coordinates are rounded to 4 decimals (~11 m) so GPS noise between two taps
/// of the same destination still hits.
pub fn cache_key(origin: Coordinate, destination: Coordinate, preference: RoutePreference) -> String {
    format!(
        "{}|{}|{}",
        origin.key_fragment(CACHE_KEY_DECIMALS),
        destination.key_fragment(CACHE_KEY_DECIMALS),
        preference
    )
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub routes: Vec<Route>,
    pub created_at: Instant,
}

/// TTL cache with FIFO eviction: once full, the entry inserted first goes,
/// regardless of how recently it was read.
#[derive(Debug)]
pub struct RouteCache {
    entries: HashMap<String, CacheEntry>,
    insertion_order: VecDeque<String>,
    ttl: Duration,
    capacity: usize,
}

impl RouteCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        RouteCache {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str, now: Instant) -> Option<&[Route]> {
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.created_at) < self.ttl)
            .map(|entry| entry.routes.as_slice())
    }

    /// Overwriting a key refreshes its timestamp but keeps its place in the
    /// eviction order.
    pub fn insert(&mut self, key: String, routes: Vec<Route>, now: Instant) {
        if !self.entries.contains_key(&key) {
            self.insertion_order.push_back(key.clone());
        }
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                routes,
                created_at: now,
            },
        );

        while self.entries.len() > self.capacity {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    tracing::debug!("Evicted oldest route cache entry: {}", oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }
}
