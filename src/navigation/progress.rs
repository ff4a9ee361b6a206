use crate::geodesy::{distance_meters, nearest_point_on_path, path_length_from};
use crate::models::{Coordinate, NavigationState, ProgressResult, ProgressUpdate, Route, RouteStep};

/// Maps live positions onto the active route.
///
/// `OffRoute` is sticky: only installing a new route brings the tracker back
/// to `Tracking`.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    state: NavigationState,
    off_route_threshold_m: f64,
}

impl ProgressTracker {
    pub fn new(off_route_threshold_m: f64) -> Self {
        ProgressTracker {
            state: NavigationState::Idle,
            off_route_threshold_m,
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// `None` only for a route without geometry.
    pub fn update_position(&mut self, position: Coordinate, route: &Route) -> Option<ProgressUpdate> {
        let progress = nearest_point_on_path(position, &route.polyline)?;

        if progress.distance_meters > self.off_route_threshold_m {
            if self.state != NavigationState::OffRoute {
                tracing::info!(
                    distance_m = progress.distance_meters,
                    nearest_index = progress.nearest_index,
                    "Driver left the route"
                );
            }
            self.state = NavigationState::OffRoute;
        } else if self.state != NavigationState::OffRoute {
            self.state = NavigationState::Tracking;
        }

        let next = next_instruction(route, &progress);
        let remaining_distance_meters = path_length_from(&route.polyline, progress.nearest_index);
        let remaining_time_seconds = if route.distance_meters > 0.0 {
            remaining_distance_meters / route.distance_meters * route.duration_seconds
        } else {
            0.0
        };

        Some(ProgressUpdate {
            progress,
            distance_to_next_meters: next.map(|step| distance_meters(position, step.location)),
            next_instruction: next.cloned(),
            remaining_distance_meters,
            remaining_time_seconds,
            state: self.state,
        })
    }

    pub fn install_route(&mut self) {
        self.state = NavigationState::Tracking;
    }

    pub fn reset(&mut self) {
        self.state = NavigationState::Idle;
    }
}

/// First step whose maneuver is still ahead of the progress point.
pub fn next_instruction<'a>(route: &'a Route, progress: &ProgressResult) -> Option<&'a RouteStep> {
    route.steps.iter().find(|step| {
        step.polyline_index >= progress.nearest_index
            && distance_meters(progress.coordinate, step.location) > 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn step(index: usize, polyline_index: usize, location: Coordinate) -> RouteStep {
        RouteStep {
            index,
            instruction_text: format!("step {index}"),
            distance_meters: 100.0,
            maneuver_type: "turn".to_string(),
            maneuver_modifier: Some("right".to_string()),
            street_name: None,
            location,
            polyline_index,
        }
    }

    /// Straight line north along lng 5.0, vertices ~111 m apart.
    fn route() -> Route {
        let polyline: Vec<Coordinate> = (0..5).map(|i| c(52.0 + i as f64 * 0.001, 5.0)).collect();
        let steps = vec![
            step(0, 0, polyline[0]),
            step(1, 2, polyline[2]),
            step(2, 4, polyline[4]),
        ];
        let distance = crate::geodesy::path_length_meters(&polyline);
        Route::new(polyline, distance, 40.0, steps, false)
    }

    /// Point `meters` east of `(lat, 5.0)`.
    fn east_of(lat: f64, meters: f64) -> Coordinate {
        let deg = meters / (111_320.0 * lat.to_radians().cos());
        c(lat, 5.0 + deg)
    }

    #[test]
    fn test_first_update_leaves_idle() {
        let route = route();
        let mut tracker = ProgressTracker::new(60.0);
        assert_eq!(tracker.state(), NavigationState::Idle);

        let update = tracker.update_position(c(52.0, 5.0), &route).unwrap();
        assert_eq!(update.state, NavigationState::Tracking);
        assert_eq!(update.progress.nearest_index, 0);
    }

    #[test]
    fn test_next_instruction_skips_step_at_current_vertex() {
        let route = route();
        let mut tracker = ProgressTracker::new(60.0);

        let update = tracker.update_position(c(52.0, 5.0), &route).unwrap();
        assert_eq!(update.next_instruction.unwrap().index, 1);

        let update = tracker.update_position(c(52.0031, 5.0), &route).unwrap();
        assert_eq!(update.progress.nearest_index, 3);
        assert_eq!(update.next_instruction.unwrap().index, 2);

        let update = tracker.update_position(c(52.004, 5.0), &route).unwrap();
        assert!(update.next_instruction.is_none());
        assert!(update.distance_to_next_meters.is_none());
        assert_eq!(update.remaining_distance_meters, 0.0);
        assert_eq!(update.remaining_time_seconds, 0.0);
    }

    #[test]
    fn test_remaining_distance_and_time() {
        let route = route();
        let mut tracker = ProgressTracker::new(60.0);
        let update = tracker.update_position(c(52.002, 5.0), &route).unwrap();

        let expected = path_length_from(&route.polyline, 2);
        assert!((update.remaining_distance_meters - expected).abs() < 1e-6);
        assert!((update.remaining_time_seconds - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_same_position_is_idempotent() {
        let route = route();
        let mut tracker = ProgressTracker::new(60.0);
        let position = c(52.0012, 5.0001);

        let first = tracker.update_position(position, &route).unwrap();
        let second = tracker.update_position(position, &route).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_off_route_boundary() {
        let route = route();

        let mut tracker = ProgressTracker::new(60.0);
        let update = tracker.update_position(east_of(52.0, 59.0), &route).unwrap();
        assert_eq!(update.state, NavigationState::Tracking);

        let update = tracker.update_position(east_of(52.0, 61.0), &route).unwrap();
        assert_eq!(update.state, NavigationState::OffRoute);
    }

    #[test]
    fn test_off_route_is_sticky_until_new_route() {
        let route = route();
        let mut tracker = ProgressTracker::new(60.0);
        tracker.update_position(east_of(52.0, 200.0), &route);
        assert_eq!(tracker.state(), NavigationState::OffRoute);

        // back on the line, still off route
        let update = tracker.update_position(c(52.001, 5.0), &route).unwrap();
        assert_eq!(update.state, NavigationState::OffRoute);

        tracker.install_route();
        let update = tracker.update_position(c(52.001, 5.0), &route).unwrap();
        assert_eq!(update.state, NavigationState::Tracking);

        tracker.reset();
        assert_eq!(tracker.state(), NavigationState::Idle);
    }

    #[test]
    fn test_empty_route_yields_nothing() {
        let empty = Route::new(vec![], 0.0, 0.0, vec![], false);
        let mut tracker = ProgressTracker::new(60.0);
        assert!(tracker.update_position(c(52.0, 5.0), &empty).is_none());
        assert_eq!(tracker.state(), NavigationState::Idle);
    }
}
