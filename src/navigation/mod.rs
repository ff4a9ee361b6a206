pub mod progress;
pub mod proximity;
pub mod reroute;
pub mod session;

use crate::config::NavigationConfig;
use crate::coordinator::{PlanRequest, RoutePlanner};
use crate::db::{DriverStatsStore, HazardStore};
use crate::error::RouteError;
use crate::models::{Coordinate, NavigationState, ProgressUpdate, Route, RoutePreference};
use crate::services::odometer::Odometer;
use crate::tasks::spawn_best_effort;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

pub use progress::ProgressTracker;
pub use proximity::{ProximityMatcher, ProximityPrompt};
pub use reroute::RerouteController;
pub use session::{NavigationSession, PositionOutcome, RerouteTicket};

/// Asynchronous outcomes surfaced on the next position report.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationEvent {
    Rerouted {
        route: Route,
    },
    RerouteRateLimited {
        retry_after_secs: u64,
        message: String,
    },
    RerouteFailed {
        code: String,
        message: String,
        retryable: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionReport {
    /// Absent when no navigation session is active
    pub progress: Option<ProgressUpdate>,
    pub prompt: Option<ProximityPrompt>,
    pub events: Vec<NavigationEvent>,
    pub rerouting: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: u64,
    pub route_id: Uuid,
    pub destination: Coordinate,
}

struct NavigatorState {
    session: Option<NavigationSession>,
    next_session_id: u64,
    reroute_task: Option<JoinHandle<()>>,
    matcher: ProximityMatcher,
    odometer: Odometer,
    events: Vec<NavigationEvent>,
}

impl NavigatorState {
    fn abort_reroute(&mut self) {
        if let Some(task) = self.reroute_task.take() {
            task.abort();
        }
    }

    fn finish_reroute(&mut self, ticket: RerouteTicket, result: Result<Vec<Route>, RouteError>) {
        let session = match self.session.as_mut() {
            Some(session) if session.accepts(&ticket) => session,
            _ => {
                tracing::debug!(
                    session_id = ticket.session_id,
                    generation = ticket.generation,
                    "Discarding stale reroute result"
                );
                return;
            }
        };
        self.reroute_task = None;

        match result {
            Ok(routes) => {
                if let Some(route) = routes.into_iter().find(|r| !r.is_alternative) {
                    if session.install_reroute(&ticket, route.clone()) {
                        self.events.push(NavigationEvent::Rerouted { route });
                        return;
                    }
                }
                session.reroute_failed(&ticket);
                let e = RouteError::NoRouteFound;
                self.events.push(NavigationEvent::RerouteFailed {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                });
            }
            Err(RouteError::RateLimited { retry_after_secs }) => {
                session.reroute_failed(&ticket);
                tracing::warn!(retry_after_secs, "Reroute rate limited");
                self.events.push(NavigationEvent::RerouteRateLimited {
                    retry_after_secs,
                    message: format!("Rerouting paused, retrying in {}s", retry_after_secs),
                });
            }
            Err(e) => {
                session.reroute_failed(&ticket);
                tracing::warn!(code = e.code(), "Reroute failed, keeping current route: {}", e);
                self.events.push(NavigationEvent::RerouteFailed {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                });
            }
        }
    }
}

/// Owns the navigation session and everything that reacts to live positions.
pub struct Navigator {
    planner: Arc<RoutePlanner>,
    hazards: Arc<dyn HazardStore>,
    stats: Arc<dyn DriverStatsStore>,
    config: NavigationConfig,
    state: Arc<Mutex<NavigatorState>>,
    /// Held for the whole of `on_position`, across the hazard lookup. Fair, so
    /// reports are applied in the order they arrive.
    position_order: AsyncMutex<()>,
}

impl Navigator {
    pub fn new(
        planner: Arc<RoutePlanner>,
        hazards: Arc<dyn HazardStore>,
        stats: Arc<dyn DriverStatsStore>,
        config: NavigationConfig,
    ) -> Self {
        let state = NavigatorState {
            session: None,
            next_session_id: 1,
            reroute_task: None,
            matcher: ProximityMatcher::new(config.proximity_radius_m),
            odometer: Odometer::new(),
            events: Vec::new(),
        };
        Navigator {
            planner,
            hazards,
            stats,
            config,
            state: Arc::new(Mutex::new(state)),
            position_order: AsyncMutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavigatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts navigating `route`, replacing any running session.
    pub fn start(
        &self,
        route: Route,
        destination: Option<Coordinate>,
        preference: RoutePreference,
    ) -> Result<SessionInfo, RouteError> {
        let destination = destination
            .or_else(|| route.destination())
            .ok_or_else(|| RouteError::InvalidInput("route has no geometry to navigate".to_string()))?;

        let mut state = self.lock();
        let id = state.next_session_id;
        let session = NavigationSession::start(id, route, destination, preference, &self.config)?;
        let info = SessionInfo {
            session_id: id,
            route_id: session.route().id,
            destination,
        };

        state.next_session_id += 1;
        state.abort_reroute();
        state.events.clear();
        state.session = Some(session);
        Ok(info)
    }

    /// Ends the session. Any reroute still in flight is cancelled and its
    /// result, should it arrive, is ignored.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        state.abort_reroute();
        state.events.clear();
        match state.session.take() {
            Some(session) => {
                tracing::info!(session_id = session.id(), "Navigation session stopped");
                true
            }
            None => false,
        }
    }

    /// Forgets which hazards were already prompted and the last known fix.
    pub fn restart_session(&self) {
        let mut state = self.lock();
        state.matcher.reset();
        state.odometer.reset();
    }

    pub fn state(&self) -> NavigationState {
        self.lock()
            .session
            .as_ref()
            .map_or(NavigationState::Idle, |s| s.state())
    }

    pub fn active_route(&self) -> Option<Route> {
        self.lock().session.as_ref().map(|s| s.route().clone())
    }

    pub fn drain_events(&self) -> Vec<NavigationEvent> {
        std::mem::take(&mut self.lock().events)
    }

    /// Feeds one live position through progress tracking, rerouting, hazard
    /// proximity and the odometer. Positions are applied in call order.
    pub async fn on_position(&self, position: Coordinate, driver_id: Option<Uuid>) -> PositionReport {
        let _order = self.position_order.lock().await;

        let alerts = match self.hazards.active_alerts().await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::warn!("Failed to load hazard alerts: {}", e);
                Vec::new()
            }
        };

        let mut state = self.lock();

        if let (Some(driver_id), Some(km)) = (driver_id, state.odometer.record(position)) {
            let stats = Arc::clone(&self.stats);
            spawn_best_effort("record driven distance", async move {
                stats.add_driven_km(driver_id, km).await
            });
        }

        let outcome = state
            .session
            .as_mut()
            .and_then(|session| session.on_position(position, Instant::now()));

        let (progress, rerouting) = match outcome {
            Some(PositionOutcome { update, reroute }) => {
                if let Some(ticket) = reroute {
                    let task = self.spawn_reroute(ticket);
                    state.reroute_task = Some(task);
                }
                let rerouting = state.session.as_ref().is_some_and(|s| s.is_rerouting());
                (Some(update), rerouting)
            }
            None => (None, false),
        };

        let prompt = state
            .matcher
            .check(position, &alerts, OffsetDateTime::now_utc());

        PositionReport {
            progress,
            prompt,
            events: std::mem::take(&mut state.events),
            rerouting,
        }
    }

    fn spawn_reroute(&self, ticket: RerouteTicket) -> JoinHandle<()> {
        let planner = Arc::clone(&self.planner);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let result = planner
                .plan(PlanRequest::reroute(
                    ticket.origin,
                    ticket.destination,
                    ticket.preference,
                ))
                .await;
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.finish_reroute(ticket, result);
        })
    }
}
