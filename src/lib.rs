// Library exports for testing and reusability

pub mod cache;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod geodesy;
pub mod models;
pub mod navigation;
pub mod routes;
pub mod services;
pub mod tasks;

// Re-export commonly used types
pub use error::{AppError, Result, RouteError};

use cache::ResponseMemo;
use coordinator::RoutePlanner;
use db::HazardStore;
use navigation::Navigator;
use services::{GeocodingService, TrafficIncidentProvider};
use std::sync::Arc;

// App state for sharing across the application
pub struct AppState {
    pub planner: Arc<RoutePlanner>,
    pub geocoder: GeocodingService,
    /// Absent without a TomTom key
    pub incidents: Option<Arc<dyn TrafficIncidentProvider>>,
    pub navigator: Navigator,
    pub hazards: Arc<dyn HazardStore>,
    pub memo: Arc<dyn ResponseMemo>,
}
