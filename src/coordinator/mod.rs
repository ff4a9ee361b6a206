pub mod backoff;
pub mod planner;
pub mod route_cache;

use crate::config::CoordinatorConfig;
use crate::models::{Coordinate, Route, RoutePreference};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

pub use backoff::{Backoff, BackoffState};
pub use planner::{CachePolicy, PlanRequest, RoutePlanner};
pub use route_cache::{cache_key, CacheEntry, RouteCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    InFlight,
    BackingOff,
    Throttled,
}

/// Outcome of asking the gate whether a network request may start now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDecision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    /// Minimum time to wait before asking again
    pub wait: Duration,
}

impl RequestDecision {
    fn allow() -> Self {
        RequestDecision {
            allowed: true,
            reason: None,
            wait: Duration::ZERO,
        }
    }

    fn deny(reason: DenyReason, wait: Duration) -> Self {
        RequestDecision {
            allowed: false,
            reason: Some(reason),
            wait,
        }
    }
}

#[derive(Debug)]
struct CoordinatorState {
    cache: RouteCache,
    backoff: BackoffState,
    in_flight: bool,
    last_request_at: Option<Instant>,
}

/// Process-wide gate in front of the routing providers: TTL cache,
/// single-flight, minimum spacing and rate-limit backoff.
///
/// Performs no I/O. All methods take the internal lock for a short synchronous
/// section only.
#[derive(Debug)]
pub struct RequestCoordinator {
    state: Mutex<CoordinatorState>,
    min_request_interval: Duration,
}

impl RequestCoordinator {
    pub fn new(config: &CoordinatorConfig) -> Self {
        RequestCoordinator {
            state: Mutex::new(CoordinatorState {
                cache: RouteCache::new(config.cache_ttl, config.cache_max_entries),
                backoff: BackoffState::default(),
                in_flight: false,
                last_request_at: None,
            }),
            min_request_interval: config.min_request_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        // State stays consistent even if a holder panicked: every section is
        // a handful of field writes.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_cached(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        preference: RoutePreference,
    ) -> Option<Vec<Route>> {
        self.get_cached_by_key(&cache_key(origin, destination, preference))
    }

    pub(crate) fn get_cached_by_key(&self, key: &str) -> Option<Vec<Route>> {
        let state = self.lock();
        let hit = state.cache.get(key, Instant::now()).map(<[Route]>::to_vec);
        if hit.is_some() {
            tracing::debug!("Route cache hit: {}", key);
        } else {
            tracing::debug!("Route cache miss: {}", key);
        }
        hit
    }

    pub fn can_make_request(&self) -> RequestDecision {
        Self::decide(&self.lock(), Instant::now(), self.min_request_interval)
    }

    fn decide(state: &CoordinatorState, now: Instant, min_interval: Duration) -> RequestDecision {
        if state.in_flight {
            return RequestDecision::deny(DenyReason::InFlight, Duration::ZERO);
        }
        if let Some(remaining) = state.backoff.remaining(now) {
            return RequestDecision::deny(DenyReason::BackingOff, remaining);
        }
        if let Some(last) = state.last_request_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < min_interval {
                return RequestDecision::deny(DenyReason::Throttled, min_interval - elapsed);
            }
        }
        RequestDecision::allow()
    }

    /// Marks a request as in flight and stamps the start time.
    pub fn start_request(&self) {
        let mut state = self.lock();
        state.in_flight = true;
        state.last_request_at = Some(Instant::now());
    }

    pub fn end_request(&self) {
        self.lock().in_flight = false;
    }

    /// Checks the gate and starts a request in one critical section.
    /// The returned permit ends the request when dropped.
    pub fn try_start_request(self: &Arc<Self>) -> Result<RequestPermit, RequestDecision> {
        let mut state = self.lock();
        let now = Instant::now();
        let decision = Self::decide(&state, now, self.min_request_interval);
        if !decision.allowed {
            tracing::debug!(reason = ?decision.reason, wait_ms = decision.wait.as_millis() as u64, "Route request gated");
            return Err(decision);
        }
        state.in_flight = true;
        state.last_request_at = Some(now);
        Ok(RequestPermit {
            coordinator: Arc::clone(self),
        })
    }

    pub fn set_cache(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        preference: RoutePreference,
        routes: Vec<Route>,
    ) {
        self.set_cache_by_key(cache_key(origin, destination, preference), routes);
    }

    pub(crate) fn set_cache_by_key(&self, key: String, routes: Vec<Route>) {
        self.lock().cache.insert(key, routes, Instant::now());
    }

    pub fn handle_rate_limited(&self) -> Backoff {
        let mut state = self.lock();
        let backoff = state.backoff.record_rate_limit(Instant::now());
        tracing::warn!(
            failure_count = state.backoff.failure_count,
            backoff_seconds = backoff.backoff_seconds,
            "Routing provider rate limited, backing off"
        );
        backoff
    }

    pub fn reset_backoff(&self) {
        let mut state = self.lock();
        if state.backoff.failure_count > 0 {
            tracing::info!("Routing provider recovered, clearing backoff");
        }
        state.backoff.reset();
    }

    pub fn clear_cache(&self) {
        self.lock().cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.lock().cache.len()
    }

    pub fn backoff_state(&self) -> BackoffState {
        self.lock().backoff
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }
}

/// Proof that a network request holds the single-flight slot.
#[derive(Debug)]
pub struct RequestPermit {
    coordinator: Arc<RequestCoordinator>,
}

impl Drop for RequestPermit {
    fn drop(&mut self) {
        self.coordinator.end_request();
    }
}
