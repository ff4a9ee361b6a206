use crate::error::{AppError, Result};
use crate::models::{Coordinate, Route, RoutePreference};
use crate::navigation::{PositionReport, SessionInfo};
use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StartNavigationRequest {
    pub route: Route,
    /// Defaults to the last point of the route
    pub destination: Option<Coordinate>,
    #[serde(default)]
    pub preference: RoutePreference,
    /// Forget hazards already prompted in earlier sessions
    #[serde(default)]
    pub reset_prompts: bool,
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub lat: f64,
    pub lng: f64,
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// POST /navigation/start
pub async fn start_navigation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartNavigationRequest>,
) -> Result<Json<SessionInfo>> {
    let info = state
        .navigator
        .start(request.route, request.destination, request.preference)?;
    if request.reset_prompts {
        state.navigator.restart_session();
    }
    Ok(Json(info))
}

/// POST /navigation/position
/// Works without an active session too; hazard prompts and driven distance
/// do not depend on navigation.
pub async fn report_position(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PositionRequest>,
) -> Result<Json<PositionReport>> {
    let position = Coordinate::new(request.lat, request.lng).map_err(AppError::InvalidRequest)?;
    let report = state.navigator.on_position(position, request.driver_id).await;
    Ok(Json(report))
}

/// POST /navigation/stop
pub async fn stop_navigation(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    let stopped = state.navigator.stop();
    Json(StopResponse { stopped })
}
