use super::{check_status, ProviderResponse, RouteQuery, RoutingProvider};
use crate::constants::{OPENROUTESERVICE_BASE_URL, ROUTE_REQUEST_TIMEOUT};
use crate::error::RouteError;
use crate::models::{Coordinate, Route, RoutePreference, RouteStep};
use async_trait::async_trait;
use geojson::{FeatureCollection, GeoJson};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DIRECTIONS_PATH: &str = "/v2/directions/driving-car/geojson";

/// OpenRouteService directions client (primary provider).
#[derive(Clone)]
pub struct OpenRouteServiceClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouteServiceClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENROUTESERVICE_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        OpenRouteServiceClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RoutingProvider for OpenRouteServiceClient {
    fn name(&self) -> &'static str {
        "openrouteservice"
    }

    #[tracing::instrument(skip(self), fields(preference = %query.preference))]
    async fn fetch_routes(&self, query: &RouteQuery) -> Result<ProviderResponse, RouteError> {
        let url = format!("{}{}", self.base_url, DIRECTIONS_PATH);
        let body = OrsRequest::from_query(query);

        tracing::debug!(
            origin_lat = query.origin.lat,
            origin_lng = query.origin.lng,
            alternatives = query.alternatives,
            "OpenRouteService request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .timeout(ROUTE_REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(RouteError::from_reqwest)?;
        let response = check_status(self.name(), response).await?;
        let text = response.text().await.map_err(RouteError::from_reqwest)?;

        OrsResponse::from_json(&text).map(ProviderResponse::OpenRouteService)
    }
}

// Request body

#[derive(Debug, Serialize)]
struct OrsRequest {
    /// [lng, lat] pairs
    coordinates: Vec<[f64; 2]>,
    instructions: bool,
    preference: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OrsOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alternative_routes: Option<OrsAlternatives>,
}

#[derive(Debug, Serialize)]
struct OrsOptions {
    avoid_features: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct OrsAlternatives {
    target_count: u32,
    weight_factor: f64,
}

impl OrsRequest {
    fn from_query(query: &RouteQuery) -> Self {
        let preference = match query.preference {
            RoutePreference::Shortest => "shortest",
            RoutePreference::Balanced | RoutePreference::Scenic => "recommended",
            RoutePreference::Fastest | RoutePreference::AvoidTolls => "fastest",
        };
        let options = (query.preference == RoutePreference::AvoidTolls).then(|| OrsOptions {
            avoid_features: vec!["tollways"],
        });
        let alternative_routes = query.alternatives.then_some(OrsAlternatives {
            target_count: 2,
            weight_factor: 1.4,
        });

        OrsRequest {
            coordinates: vec![
                [query.origin.lng, query.origin.lat],
                [query.destination.lng, query.destination.lat],
            ],
            instructions: true,
            preference,
            options,
            alternative_routes,
        }
    }
}

// Response

/// ORS answers with a GeoJSON FeatureCollection, one LineString feature per route.
#[derive(Debug, Clone)]
pub struct OrsResponse {
    collection: FeatureCollection,
}

#[derive(Debug, Deserialize)]
struct OrsProperties {
    #[serde(default)]
    summary: OrsSummary,
    #[serde(default)]
    segments: Vec<OrsSegment>,
}

// ORS omits zero-valued summary fields
#[derive(Debug, Default, Deserialize)]
struct OrsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OrsSegment {
    #[serde(default)]
    steps: Vec<OrsStep>,
}

#[derive(Debug, Deserialize)]
struct OrsStep {
    #[serde(default)]
    distance: f64,
    #[serde(rename = "type")]
    step_type: u8,
    #[serde(default)]
    instruction: String,
    #[serde(default)]
    name: Option<String>,
    way_points: [usize; 2],
}

impl OrsResponse {
    pub fn from_json(body: &str) -> Result<Self, RouteError> {
        match body.parse::<GeoJson>() {
            Ok(GeoJson::FeatureCollection(collection)) => Ok(OrsResponse { collection }),
            Ok(_) => Err(RouteError::Parse(
                "expected a FeatureCollection".to_string(),
            )),
            Err(e) => Err(RouteError::Parse(e.to_string())),
        }
    }

    pub(super) fn into_routes(self) -> Result<Vec<Route>, RouteError> {
        self.collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| {
                let polyline = match feature.geometry.map(|g| g.value) {
                    Some(geojson::Value::LineString(points)) => points
                        .iter()
                        .map(|p| match (p.first(), p.get(1)) {
                            // GeoJSON positions are [lng, lat]
                            (Some(lng), Some(lat)) => Ok(Coordinate { lat: *lat, lng: *lng }),
                            _ => Err(RouteError::Parse("position with fewer than 2 values".into())),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => {
                        return Err(RouteError::Parse(
                            "route geometry is not a LineString".to_string(),
                        ))
                    }
                };

                let properties: OrsProperties = serde_json::from_value(serde_json::Value::Object(
                    feature.properties.unwrap_or_default(),
                ))
                .map_err(|e| RouteError::Parse(format!("route properties: {}", e)))?;

                let steps = flatten_steps(&properties.segments, &polyline)?;

                Ok(Route::new(
                    polyline,
                    properties.summary.distance,
                    properties.summary.duration,
                    steps,
                    i > 0,
                ))
            })
            .collect()
    }
}

fn flatten_steps(segments: &[OrsSegment], polyline: &[Coordinate]) -> Result<Vec<RouteStep>, RouteError> {
    segments
        .iter()
        .flat_map(|segment| segment.steps.iter())
        .enumerate()
        .map(|(index, step)| {
            let polyline_index = step.way_points[0];
            let location = polyline.get(polyline_index).copied().ok_or_else(|| {
                RouteError::Parse(format!(
                    "step way point {} outside geometry of {} points",
                    polyline_index,
                    polyline.len()
                ))
            })?;
            let (maneuver_type, maneuver_modifier) = maneuver(step.step_type);

            Ok(RouteStep {
                index,
                instruction_text: step.instruction.clone(),
                distance_meters: step.distance,
                maneuver_type: maneuver_type.to_string(),
                maneuver_modifier: maneuver_modifier.map(str::to_string),
                // ORS uses "-" for unnamed ways
                street_name: step
                    .name
                    .clone()
                    .filter(|n| !n.is_empty() && n != "-"),
                location,
                polyline_index,
            })
        })
        .collect()
}

/// ORS instruction type codes.
fn maneuver(step_type: u8) -> (&'static str, Option<&'static str>) {
    match step_type {
        0 => ("turn", Some("left")),
        1 => ("turn", Some("right")),
        2 => ("turn", Some("sharp left")),
        3 => ("turn", Some("sharp right")),
        4 => ("turn", Some("slight left")),
        5 => ("turn", Some("slight right")),
        6 => ("continue", Some("straight")),
        7 => ("roundabout", None),
        8 => ("exit roundabout", None),
        9 => ("uturn", None),
        10 => ("arrive", None),
        11 => ("depart", None),
        12 => ("fork", Some("left")),
        13 => ("fork", Some("right")),
        _ => ("continue", None),
    }
}
