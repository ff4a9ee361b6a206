use async_trait::async_trait;
use roadwatch::config::{CoordinatorConfig, NavigationConfig};
use roadwatch::coordinator::{RequestCoordinator, RoutePlanner};
use roadwatch::db::{InMemoryDriverStatsStore, InMemoryHazardStore};
use roadwatch::error::RouteError;
use roadwatch::geodesy::path_length_meters;
use roadwatch::models::{AlertStatus, Coordinate, HazardAlert, HazardCategory, Route};
use roadwatch::navigation::Navigator;
use roadwatch::services::providers::{OrsResponse, ProviderResponse, RouteQuery, RoutingProvider};
use roadwatch::services::{LocalClock, RouteAcquisitionService};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::Instant;
use uuid::Uuid;

/// Coordinate shorthand for tests
#[allow(dead_code)]
pub fn c(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).unwrap()
}

/// Straight path from `from` to `to` with `points` evenly spaced vertices
#[allow(dead_code)]
pub fn straight_path(from: Coordinate, to: Coordinate, points: usize) -> Vec<Coordinate> {
    let last = (points.max(2) - 1) as f64;
    (0..points.max(2))
        .map(|i| {
            let t = i as f64 / last;
            c(
                from.lat + (to.lat - from.lat) * t,
                from.lng + (to.lng - from.lng) * t,
            )
        })
        .collect()
}

/// Route along lng 5.0 from lat 52.0 to 52.004, vertices ~111 m apart
#[allow(dead_code)]
pub fn north_route() -> Route {
    let polyline = straight_path(c(52.0, 5.0), c(52.004, 5.0), 5);
    let distance = path_length_meters(&polyline);
    Route::new(polyline, distance, distance / 13.9, vec![], false)
}

/// ~150 m east of `north_route`
#[allow(dead_code)]
pub fn off_north_route() -> Coordinate {
    c(52.001, 5.0022)
}

/// ORS GeoJSON body for a single route without instructions
#[allow(dead_code)]
pub fn ors_body(path: &[Coordinate], distance: f64, duration: f64) -> String {
    let coordinates: Vec<[f64; 2]> = path.iter().map(|p| [p.lng, p.lat]).collect();
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {"type": "LineString", "coordinates": coordinates},
            "properties": {
                "summary": {"distance": distance, "duration": duration},
                "segments": []
            }
        }]
    })
    .to_string()
}

/// Routing provider that answers from a script, then with a straight line
/// from origin to destination.
#[allow(dead_code)]
pub struct StubProvider {
    script: Mutex<VecDeque<Result<String, RouteError>>>,
    calls: Mutex<Vec<(Instant, RouteQuery)>>,
    delay: Duration,
}

#[allow(dead_code)]
impl StubProvider {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        StubProvider {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay,
        }
    }

    /// Queues a raw ORS body
    pub fn push_body(&self, body: String) {
        self.script.lock().unwrap().push_back(Ok(body));
    }

    pub fn push_error(&self, error: RouteError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn push_rate_limit(&self) {
        self.push_error(RouteError::RateLimited { retry_after_secs: 0 });
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn queries(&self) -> Vec<RouteQuery> {
        self.calls.lock().unwrap().iter().map(|(_, q)| *q).collect()
    }
}

#[async_trait]
impl RoutingProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_routes(&self, query: &RouteQuery) -> Result<ProviderResponse, RouteError> {
        self.calls.lock().unwrap().push((Instant::now(), *query));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        let body = match scripted {
            Some(result) => result?,
            None => {
                let path = straight_path(query.origin, query.destination, 5);
                let distance = path_length_meters(&path);
                ors_body(&path, distance, distance / 13.9)
            }
        };
        OrsResponse::from_json(&body).map(ProviderResponse::OpenRouteService)
    }
}

/// Planner over `provider` with default gate settings and no live traffic.
/// The pinned hour (03:00) keeps the heuristic multiplier at 1.0.
#[allow(dead_code)]
pub fn planner(provider: Arc<StubProvider>) -> Arc<RoutePlanner> {
    planner_with_config(provider, &CoordinatorConfig::default())
}

#[allow(dead_code)]
pub fn planner_with_config(provider: Arc<StubProvider>, config: &CoordinatorConfig) -> Arc<RoutePlanner> {
    let acquisition = Arc::new(RouteAcquisitionService::new(
        provider,
        None,
        None,
        LocalClock::Fixed(3),
    ));
    let coordinator = Arc::new(RequestCoordinator::new(config));
    Arc::new(RoutePlanner::new(coordinator, acquisition))
}

/// Navigator wired to in-memory stores
#[allow(dead_code)]
pub struct Harness {
    pub provider: Arc<StubProvider>,
    pub planner: Arc<RoutePlanner>,
    pub hazards: Arc<InMemoryHazardStore>,
    pub stats: Arc<InMemoryDriverStatsStore>,
    pub navigator: Navigator,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(provider: StubProvider) -> Self {
        let provider = Arc::new(provider);
        let planner = planner(provider.clone());
        let hazards = Arc::new(InMemoryHazardStore::default());
        let stats = Arc::new(InMemoryDriverStatsStore::default());
        let navigator = Navigator::new(
            planner.clone(),
            hazards.clone(),
            stats.clone(),
            NavigationConfig::default(),
        );
        Harness {
            provider,
            planner,
            hazards,
            stats,
            navigator,
        }
    }
}

#[allow(dead_code)]
pub fn hazard_at(lat: f64, lng: f64) -> HazardAlert {
    HazardAlert {
        id: Uuid::new_v4(),
        lat,
        lng,
        alert_type: "fixed_camera".to_string(),
        category: HazardCategory::Speed,
        status: AlertStatus::Active,
        created_at: OffsetDateTime::now_utc(),
        expires_at: None,
        confirm_count: 3,
        deny_count: 0,
    }
}

/// Lets spawned background work run to completion
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
