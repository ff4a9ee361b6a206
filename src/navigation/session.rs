use crate::config::NavigationConfig;
use crate::error::RouteError;
use crate::models::{Coordinate, NavigationState, ProgressUpdate, Route, RoutePreference};
use crate::navigation::progress::ProgressTracker;
use crate::navigation::reroute::RerouteController;
use tokio::time::Instant;

/// Identifies the route a reroute attempt was issued against. A result is only
/// installed while both numbers still match the live session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerouteTicket {
    pub session_id: u64,
    pub generation: u64,
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub preference: RoutePreference,
}

#[derive(Debug, Clone)]
pub struct PositionOutcome {
    pub update: ProgressUpdate,
    /// Set when this position triggered a reroute attempt
    pub reroute: Option<RerouteTicket>,
}

/// One navigation run from start to stop.
#[derive(Debug)]
pub struct NavigationSession {
    id: u64,
    route: Route,
    destination: Coordinate,
    preference: RoutePreference,
    tracker: ProgressTracker,
    reroute: RerouteController,
    /// Bumped whenever a new route is installed
    generation: u64,
    current_step_idx: usize,
}

impl NavigationSession {
    pub fn start(
        id: u64,
        route: Route,
        destination: Coordinate,
        preference: RoutePreference,
        config: &NavigationConfig,
    ) -> Result<Self, RouteError> {
        if route.polyline.is_empty() {
            return Err(RouteError::InvalidInput(
                "route has no geometry to navigate".to_string(),
            ));
        }
        destination
            .validate()
            .map_err(|e| RouteError::InvalidInput(format!("destination: {}", e)))?;

        tracing::info!(
            session_id = id,
            route_id = %route.id,
            distance_m = route.distance_meters,
            "Navigation session started"
        );

        Ok(NavigationSession {
            id,
            route,
            destination,
            preference,
            tracker: ProgressTracker::new(config.off_route_threshold_m),
            reroute: RerouteController::new(config.reroute_throttle),
            generation: 0,
            current_step_idx: 0,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn destination(&self) -> Coordinate {
        self.destination
    }

    pub fn state(&self) -> NavigationState {
        self.tracker.state()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_step_idx(&self) -> usize {
        self.current_step_idx
    }

    pub fn is_rerouting(&self) -> bool {
        self.reroute.is_outstanding()
    }

    pub fn on_position(&mut self, position: Coordinate, now: Instant) -> Option<PositionOutcome> {
        let update = self.tracker.update_position(position, &self.route)?;

        self.current_step_idx = update
            .next_instruction
            .as_ref()
            .map_or(self.route.steps.len(), |step| step.index);

        let reroute = self
            .reroute
            .should_attempt(update.state, now)
            .then(|| RerouteTicket {
                session_id: self.id,
                generation: self.generation,
                origin: position,
                destination: self.destination,
                preference: self.preference,
            });

        if reroute.is_some() {
            tracing::info!(
                session_id = self.id,
                generation = self.generation,
                distance_m = update.progress.distance_meters,
                "Off route, requesting new route"
            );
        }

        Some(PositionOutcome { update, reroute })
    }

    pub fn accepts(&self, ticket: &RerouteTicket) -> bool {
        ticket.session_id == self.id && ticket.generation == self.generation
    }

    /// Installs a reroute result. Returns false, leaving the session untouched,
    /// when the ticket is stale.
    pub fn install_reroute(&mut self, ticket: &RerouteTicket, route: Route) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.reroute.settle();
        if route.polyline.is_empty() {
            tracing::warn!(session_id = self.id, "Reroute returned a route without geometry");
            return false;
        }

        self.route = route;
        self.generation += 1;
        self.current_step_idx = 0;
        self.tracker.install_route();
        tracing::info!(
            session_id = self.id,
            generation = self.generation,
            route_id = %self.route.id,
            "Reroute installed"
        );
        true
    }

    /// Records a failed attempt. The current route stays active.
    pub fn reroute_failed(&mut self, ticket: &RerouteTicket) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.reroute.settle();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn line_route(start_lat: f64) -> Route {
        let polyline: Vec<Coordinate> = (0..5).map(|i| c(start_lat + i as f64 * 0.001, 5.0)).collect();
        Route::new(polyline, 444.0, 40.0, vec![], false)
    }

    fn session() -> NavigationSession {
        NavigationSession::start(
            1,
            line_route(52.0),
            c(52.004, 5.0),
            RoutePreference::Fastest,
            &NavigationConfig::default(),
        )
        .unwrap()
    }

    // ~150 m east of the line
    fn off_route() -> Coordinate {
        c(52.001, 5.0022)
    }

    #[test]
    fn test_rejects_empty_route() {
        let result = NavigationSession::start(
            1,
            Route::new(vec![], 0.0, 0.0, vec![], false),
            c(52.0, 5.0),
            RoutePreference::Fastest,
            &NavigationConfig::default(),
        );
        assert!(matches!(result, Err(RouteError::InvalidInput(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reroute_throttled_from_trigger() {
        let mut session = session();
        let start = Instant::now();

        let ticket = session.on_position(off_route(), start).unwrap().reroute.unwrap();
        assert_eq!(ticket.origin, off_route());
        assert_eq!(ticket.destination, c(52.004, 5.0));
        assert!(session.reroute_failed(&ticket));

        let at_5s = session.on_position(off_route(), start + Duration::from_secs(5)).unwrap();
        assert_eq!(at_5s.update.state, NavigationState::OffRoute);
        assert!(at_5s.reroute.is_none());

        let at_10s = session.on_position(off_route(), start + Duration::from_secs(10)).unwrap();
        assert!(at_10s.reroute.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_resets_tracking_and_step() {
        let mut session = session();
        let ticket = session
            .on_position(off_route(), Instant::now())
            .unwrap()
            .reroute
            .unwrap();

        assert!(session.install_reroute(&ticket, line_route(52.001)));
        assert_eq!(session.state(), NavigationState::Tracking);
        assert_eq!(session.current_step_idx(), 0);
        assert_eq!(session.generation(), 1);
        assert!(!session.is_rerouting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_discarded() {
        let mut session = session();
        let ticket = session
            .on_position(off_route(), Instant::now())
            .unwrap()
            .reroute
            .unwrap();
        let original_route = session.route().id;

        let stale = RerouteTicket {
            generation: ticket.generation + 1,
            ..ticket
        };
        assert!(!session.install_reroute(&stale, line_route(52.001)));
        assert_eq!(session.route().id, original_route);

        let other_session = RerouteTicket {
            session_id: 99,
            ..ticket
        };
        assert!(!session.install_reroute(&other_session, line_route(52.001)));
        assert!(session.is_rerouting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reroute_keeps_route() {
        let mut session = session();
        let route_id = session.route().id;
        let ticket = session
            .on_position(off_route(), Instant::now())
            .unwrap()
            .reroute
            .unwrap();

        assert!(session.reroute_failed(&ticket));
        assert_eq!(session.route().id, route_id);
        assert_eq!(session.state(), NavigationState::OffRoute);
    }
}
