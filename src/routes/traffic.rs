use crate::error::{AppError, Result};
use crate::models::{BoundingBox, TrafficIncident};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct IncidentQuery {
    /// `minLng,minLat,maxLng,maxLat`
    pub bbox: String,
}

#[derive(Debug, Serialize)]
pub struct IncidentResponse {
    pub incidents: Vec<TrafficIncident>,
}

/// GET /traffic/incidents?bbox=
pub async fn list_incidents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IncidentQuery>,
) -> Result<Json<IncidentResponse>> {
    let bbox: BoundingBox = query.bbox.parse().map_err(AppError::InvalidRequest)?;
    let provider = state
        .incidents
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("traffic incidents are not configured".to_string()))?;

    let incidents = provider.incidents_in(bbox).await?;
    Ok(Json(IncidentResponse { incidents }))
}
