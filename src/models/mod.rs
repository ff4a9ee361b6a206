pub mod coordinates;
pub mod hazard;
pub mod incident;
pub mod place;
pub mod progress;
pub mod route;

pub use coordinates::Coordinate;
pub use hazard::{AlertStatus, HazardAlert, HazardCategory};
pub use incident::{BoundingBox, IncidentCategory, TrafficIncident};
pub use place::{FlowSample, Place};
pub use progress::{NavigationState, ProgressResult, ProgressUpdate};
pub use route::{ProviderChoice, Route, RouteBounds, RoutePreference, RouteStep};
