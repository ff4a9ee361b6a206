use crate::coordinator::PlanRequest;
use crate::error::{AppError, Result};
use crate::models::route::{RouteRequest, RouteResponse};
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// POST /routes
/// Fetch a route and its alternatives between two points
pub async fn create_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>> {
    request.validate().map_err(AppError::InvalidRequest)?;

    tracing::info!(
        origin_lat = request.origin.lat,
        origin_lng = request.origin.lng,
        destination_lat = request.destination.lat,
        destination_lng = request.destination.lng,
        preference = %request.preference,
        "Route request"
    );

    let plan = PlanRequest::new(request.origin, request.destination, request.preference)
        .with_provider(request.provider)
        .with_traffic(request.include_traffic);
    let routes = state.planner.plan(plan).await?;

    tracing::info!("Returning {} routes", routes.len());
    Ok(Json(RouteResponse { routes }))
}
