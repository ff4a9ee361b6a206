use crate::error::{AppError, Result};
use crate::models::{Coordinate, Place};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl GeocodeQuery {
    /// The bias point, when both halves are present.
    fn near(&self) -> std::result::Result<Option<Coordinate>, String> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng).map(Some),
            (None, None) => Ok(None),
            _ => Err("lat and lng must be given together".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub places: Vec<Place>,
}

/// GET /geocode?q=&lat=&lng=
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>> {
    let near = query.near().map_err(AppError::InvalidRequest)?;
    let places = state.geocoder.search(&query.q, near).await;
    Ok(Json(GeocodeResponse { places }))
}
