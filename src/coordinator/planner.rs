use crate::coordinator::backoff::ceil_secs;
use crate::coordinator::{cache_key, DenyReason, RequestCoordinator, RequestPermit};
use crate::error::RouteError;
use crate::models::{Coordinate, ProviderChoice, Route, RoutePreference};
use crate::services::providers::RouteQuery;
use crate::services::route_acquisition::RouteAcquisitionService;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type SharedRoutes = Shared<BoxFuture<'static, Result<Vec<Route>, RouteError>>>;

/// Poll interval when the gate reports a request in flight that this planner
/// did not start.
const FOREIGN_IN_FLIGHT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve from and populate the route cache
    Use,
    /// Neither read nor write the cache
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRequest {
    pub query: RouteQuery,
    pub include_traffic: bool,
    pub provider: ProviderChoice,
    pub cache: CachePolicy,
}

impl PlanRequest {
    /// A driver-initiated request: alternatives, cache, primary provider.
    pub fn new(origin: Coordinate, destination: Coordinate, preference: RoutePreference) -> Self {
        PlanRequest {
            query: RouteQuery {
                origin,
                destination,
                preference,
                alternatives: true,
            },
            include_traffic: true,
            provider: ProviderChoice::default(),
            cache: CachePolicy::Use,
        }
    }

    /// A reroute from the current position: single route, cache bypassed.
    pub fn reroute(origin: Coordinate, destination: Coordinate, preference: RoutePreference) -> Self {
        let mut request = Self::new(origin, destination, preference);
        request.query.alternatives = false;
        request.cache = CachePolicy::Bypass;
        request
    }

    pub fn with_provider(mut self, provider: ProviderChoice) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_traffic(mut self, include_traffic: bool) -> Self {
        self.include_traffic = include_traffic;
        self
    }

    fn key(&self) -> String {
        cache_key(self.query.origin, self.query.destination, self.query.preference)
    }
}

struct InFlight {
    id: u64,
    key: String,
    request: PlanRequest,
    result: SharedRoutes,
}

impl InFlight {
    /// Whether a waiter for `key` can take this outcome as its own. Cache
    /// policy, provider and alternatives must all agree.
    fn serves(&self, key: &str, request: &PlanRequest) -> bool {
        self.key == key
            && self.request.cache == request.cache
            && self.request.provider == request.provider
            && self.request.query.alternatives == request.query.alternatives
    }
}

/// Async front door for route requests. Owns the single in-flight network
/// request so identical callers can share its outcome.
pub struct RoutePlanner {
    coordinator: Arc<RequestCoordinator>,
    acquisition: Arc<RouteAcquisitionService>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    next_id: AtomicU64,
}

enum Step {
    Done(SharedRoutes),
    WaitFor(SharedRoutes),
    Sleep(Duration),
    Fail(RouteError),
}

impl RoutePlanner {
    pub fn new(coordinator: Arc<RequestCoordinator>, acquisition: Arc<RouteAcquisitionService>) -> Self {
        RoutePlanner {
            coordinator,
            acquisition,
            in_flight: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn plan(&self, request: PlanRequest) -> Result<Vec<Route>, RouteError> {
        request
            .query
            .origin
            .validate()
            .map_err(|e| RouteError::InvalidInput(format!("origin: {}", e)))?;
        request
            .query
            .destination
            .validate()
            .map_err(|e| RouteError::InvalidInput(format!("destination: {}", e)))?;

        let key = request.key();
        if request.cache == CachePolicy::Use {
            if let Some(routes) = self.coordinator.get_cached_by_key(&key) {
                return Ok(routes);
            }
        }

        loop {
            match self.next_step(&key, &request) {
                Step::Done(result) => return result.await,
                Step::WaitFor(other) => {
                    // Outcome belongs to a different request
                    let _ = other.await;
                }
                Step::Sleep(wait) => tokio::time::sleep(wait).await,
                Step::Fail(e) => return Err(e),
            }

            // The request we waited on may have filled the cache for us
            if request.cache == CachePolicy::Use {
                if let Some(routes) = self.coordinator.get_cached_by_key(&key) {
                    return Ok(routes);
                }
            }
        }
    }

    /// One synchronous pass over the in-flight slot and the gate.
    fn next_step(&self, key: &str, request: &PlanRequest) -> Step {
        let mut slot = self.lock_in_flight();

        if let Some(current) = slot.as_ref() {
            if current.serves(key, request) {
                tracing::debug!("Joining in-flight route request: {}", key);
                return Step::Done(current.result.clone());
            }
        }

        match self.coordinator.try_start_request() {
            Ok(permit) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let result = self.launch(id, key.to_string(), *request, permit);
                *slot = Some(InFlight {
                    id,
                    key: key.to_string(),
                    request: *request,
                    result: result.clone(),
                });
                Step::Done(result)
            }
            Err(decision) => match decision.reason {
                Some(DenyReason::InFlight) => match slot.as_ref() {
                    Some(current) => Step::WaitFor(current.result.clone()),
                    None => Step::Sleep(FOREIGN_IN_FLIGHT_POLL),
                },
                Some(DenyReason::Throttled) => Step::Sleep(decision.wait),
                Some(DenyReason::BackingOff) => Step::Fail(RouteError::RateLimited {
                    retry_after_secs: ceil_secs(decision.wait),
                }),
                None => Step::Sleep(decision.wait),
            },
        }
    }

    /// Runs the provider call on its own task so it completes (and releases the
    /// permit) even if every waiter goes away.
    fn launch(&self, id: u64, key: String, request: PlanRequest, permit: RequestPermit) -> SharedRoutes {
        let coordinator = Arc::clone(&self.coordinator);
        let acquisition = Arc::clone(&self.acquisition);
        let slot = Arc::clone(&self.in_flight);

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let result = acquisition
                .acquire(&request.query, request.include_traffic, request.provider)
                .await;

            let result = match result {
                Ok(routes) => {
                    coordinator.reset_backoff();
                    if request.cache == CachePolicy::Use {
                        coordinator.set_cache_by_key(key.clone(), routes.clone());
                    }
                    Ok(routes)
                }
                Err(RouteError::RateLimited { .. }) => {
                    let backoff = coordinator.handle_rate_limited();
                    Err(RouteError::RateLimited {
                        retry_after_secs: backoff.backoff_seconds,
                    })
                }
                Err(e) => {
                    tracing::warn!(code = e.code(), "Route request failed: {}", e);
                    Err(e)
                }
            };

            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|current| current.id == id) {
                *slot = None;
            }
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(RouteError::Network(format!("route task failed: {}", e))))
        }
        .boxed()
        .shared()
    }
}
