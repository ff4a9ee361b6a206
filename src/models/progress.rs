use crate::models::{Coordinate, RouteStep};
use serde::{Deserialize, Serialize};

/// Nearest polyline vertex to the current position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProgressResult {
    pub nearest_index: usize,
    /// Distance from the position to that vertex, in meters
    pub distance_meters: f64,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    Idle,
    Tracking,
    OffRoute,
}

/// Output of one position tick against the active route.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressUpdate {
    pub progress: ProgressResult,
    pub next_instruction: Option<RouteStep>,
    /// Distance from the current position to that step's maneuver, in meters
    pub distance_to_next_meters: Option<f64>,
    pub remaining_distance_meters: f64,
    pub remaining_time_seconds: f64,
    pub state: NavigationState,
}
