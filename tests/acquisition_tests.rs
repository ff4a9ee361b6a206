use async_trait::async_trait;
use roadwatch::error::RouteError;
use roadwatch::models::{Coordinate, FlowSample, ProviderChoice, RoutePreference};
use roadwatch::services::providers::RouteQuery;
use roadwatch::services::{LocalClock, RouteAcquisitionService, TrafficFlowProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::{c, ors_body, straight_path, StubProvider};

enum FlowScript {
    Sample(FlowSample),
    Missing,
    Fails,
    Hangs,
}

struct StubFlow {
    script: FlowScript,
    calls: AtomicUsize,
}

impl StubFlow {
    fn new(script: FlowScript) -> Arc<Self> {
        Arc::new(StubFlow {
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TrafficFlowProvider for StubFlow {
    async fn flow_at(&self, _point: Coordinate) -> Result<Option<FlowSample>, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            FlowScript::Sample(sample) => Ok(Some(sample)),
            FlowScript::Missing => Ok(None),
            FlowScript::Fails => Err(RouteError::Network("flow unavailable".to_string())),
            FlowScript::Hangs => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }
    }
}

fn query() -> RouteQuery {
    RouteQuery {
        origin: c(52.3676, 4.9041),
        destination: c(52.0907, 5.1214),
        preference: RoutePreference::Fastest,
        alternatives: true,
    }
}

fn provider() -> Arc<StubProvider> {
    let provider = Arc::new(StubProvider::new());
    let path = straight_path(c(52.3676, 4.9041), c(52.0907, 5.1214), 10);
    provider.push_body(ors_body(&path, 45_000.0, 1_800.0));
    provider
}

fn service(flow: Option<Arc<StubFlow>>, hour: u8) -> RouteAcquisitionService {
    RouteAcquisitionService::new(
        provider(),
        None,
        flow.map(|f| f as Arc<dyn TrafficFlowProvider>),
        LocalClock::Fixed(hour),
    )
}

#[tokio::test]
async fn test_live_flow_takes_precedence() {
    let flow = StubFlow::new(FlowScript::Sample(FlowSample {
        current_speed_kmh: 40.0,
        free_flow_speed_kmh: 100.0,
        confidence: 0.9,
    }));
    let routes = service(Some(flow.clone()), 8)
        .acquire(&query(), true, ProviderChoice::Primary)
        .await
        .unwrap();

    let route = &routes[0];
    assert!(route.has_live_traffic_data);
    assert_eq!(route.traffic_multiplier, 2.5);
    assert_eq!(route.adjusted_duration_seconds, 4_500.0);
    assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_live_flow_never_speeds_up() {
    let flow = StubFlow::new(FlowScript::Sample(FlowSample {
        current_speed_kmh: 120.0,
        free_flow_speed_kmh: 100.0,
        confidence: 1.0,
    }));
    let routes = service(Some(flow), 8)
        .acquire(&query(), true, ProviderChoice::Primary)
        .await
        .unwrap();

    assert_eq!(routes[0].traffic_multiplier, 1.0);
    assert_eq!(routes[0].adjusted_duration_seconds, 1_800.0);
    assert!(routes[0].has_live_traffic_data);
}

#[tokio::test]
async fn test_rush_hour_heuristic_without_flow() {
    let routes = service(None, 8)
        .acquire(&query(), true, ProviderChoice::Primary)
        .await
        .unwrap();

    assert!(!routes[0].has_live_traffic_data);
    assert!((routes[0].adjusted_duration_seconds - 2_340.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_failed_flow_falls_back_to_heuristic() {
    let missing = StubFlow::new(FlowScript::Missing);
    let routes = service(Some(missing), 12)
        .acquire(&query(), true, ProviderChoice::Primary)
        .await
        .unwrap();
    assert!((routes[0].traffic_multiplier - 1.1).abs() < 1e-9);

    let failing = StubFlow::new(FlowScript::Fails);
    let routes = service(Some(failing), 22)
        .acquire(&query(), true, ProviderChoice::Primary)
        .await
        .unwrap();
    assert_eq!(routes[0].traffic_multiplier, 1.0);
    assert!(!routes[0].has_live_traffic_data);
}

#[tokio::test(start_paused = true)]
async fn test_slow_flow_lookup_is_cut_off() {
    let hanging = StubFlow::new(FlowScript::Hangs);
    let started = tokio::time::Instant::now();
    let routes = service(Some(hanging), 17)
        .acquire(&query(), true, ProviderChoice::Primary)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!((routes[0].traffic_multiplier - 1.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_traffic_not_requested_skips_flow() {
    let flow = StubFlow::new(FlowScript::Sample(FlowSample {
        current_speed_kmh: 20.0,
        free_flow_speed_kmh: 100.0,
        confidence: 1.0,
    }));
    let routes = service(Some(flow.clone()), 8)
        .acquire(&query(), false, ProviderChoice::Primary)
        .await
        .unwrap();

    assert_eq!(routes[0].traffic_multiplier, 1.0);
    assert_eq!(routes[0].adjusted_duration_seconds, routes[0].duration_seconds);
    assert_eq!(flow.calls.load(Ordering::SeqCst), 0);
}
