pub mod debug;
pub mod geocode;
pub mod navigation;
pub mod route;
pub mod traffic;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/routes", post(route::create_route))
        .route("/geocode", get(geocode::search_places))
        .route("/traffic/incidents", get(traffic::list_incidents))
        .route("/navigation/start", post(navigation::start_navigation))
        .route("/navigation/position", post(navigation::report_position))
        .route("/navigation/stop", post(navigation::stop_navigation))
        .route("/debug/health", get(debug::health_check))
        .with_state(state)
}
