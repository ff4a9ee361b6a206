use super::{check_status, ProviderResponse, RouteQuery, RoutingProvider};
use crate::constants::{ROUTE_REQUEST_TIMEOUT, TOMTOM_BASE_URL};
use crate::error::RouteError;
use crate::models::{Coordinate, Route, RoutePreference, RouteStep};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// TomTom Routing client (secondary provider).
#[derive(Clone)]
pub struct TomTomRoutingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TomTomRoutingClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, TOMTOM_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        TomTomRoutingClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn query_params(&self, query: &RouteQuery) -> Vec<(&'static str, String)> {
        let route_type = match query.preference {
            RoutePreference::Shortest => "shortest",
            RoutePreference::Scenic => "thrilling",
            RoutePreference::Balanced => "eco",
            RoutePreference::Fastest | RoutePreference::AvoidTolls => "fastest",
        };

        let mut params = vec![
            ("key", self.api_key.clone()),
            ("routeType", route_type.to_string()),
            ("traffic", "true".to_string()),
            ("instructionsType", "text".to_string()),
            ("travelMode", "car".to_string()),
        ];
        if query.preference == RoutePreference::AvoidTolls {
            params.push(("avoid", "tollRoads".to_string()));
        }
        if query.alternatives {
            params.push(("maxAlternatives", "2".to_string()));
        }
        params
    }
}

#[async_trait]
impl RoutingProvider for TomTomRoutingClient {
    fn name(&self) -> &'static str {
        "tomtom"
    }

    #[tracing::instrument(skip(self), fields(preference = %query.preference))]
    async fn fetch_routes(&self, query: &RouteQuery) -> Result<ProviderResponse, RouteError> {
        let url = format!(
            "{}/routing/1/calculateRoute/{},{}:{},{}/json",
            self.base_url,
            query.origin.lat,
            query.origin.lng,
            query.destination.lat,
            query.destination.lng
        );

        tracing::debug!(
            origin_lat = query.origin.lat,
            origin_lng = query.origin.lng,
            alternatives = query.alternatives,
            "TomTom routing request"
        );

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(query))
            .timeout(ROUTE_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(RouteError::from_reqwest)?;
        let response = check_status(self.name(), response).await?;
        let text = response.text().await.map_err(RouteError::from_reqwest)?;

        TomTomResponse::from_json(&text).map(ProviderResponse::TomTom)
    }
}

// Response types

#[derive(Debug, Clone, Deserialize)]
pub struct TomTomResponse {
    #[serde(default)]
    routes: Vec<TomTomRoute>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomTomRoute {
    summary: TomTomSummary,
    #[serde(default)]
    legs: Vec<TomTomLeg>,
    #[serde(default)]
    guidance: Option<TomTomGuidance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomTomSummary {
    length_in_meters: f64,
    travel_time_in_seconds: f64,
    #[serde(default)]
    traffic_delay_in_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct TomTomLeg {
    #[serde(default)]
    points: Vec<TomTomPoint>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TomTomPoint {
    latitude: f64,
    longitude: f64,
}

impl From<TomTomPoint> for Coordinate {
    fn from(p: TomTomPoint) -> Self {
        Coordinate {
            lat: p.latitude,
            lng: p.longitude,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TomTomGuidance {
    #[serde(default)]
    instructions: Vec<TomTomInstruction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomTomInstruction {
    route_offset_in_meters: f64,
    point: TomTomPoint,
    #[serde(default)]
    point_index: usize,
    #[serde(default)]
    maneuver: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    street: Option<String>,
}

impl TomTomResponse {
    pub fn from_json(body: &str) -> Result<Self, RouteError> {
        serde_json::from_str(body).map_err(|e| RouteError::Parse(e.to_string()))
    }

    pub(super) fn into_routes(self) -> Result<Vec<Route>, RouteError> {
        Ok(self
            .routes
            .into_iter()
            .enumerate()
            .map(|(i, route)| {
                let polyline: Vec<Coordinate> = route
                    .legs
                    .iter()
                    .flat_map(|leg| leg.points.iter().copied().map(Coordinate::from))
                    .collect();
                let instructions = route.guidance.map(|g| g.instructions).unwrap_or_default();
                let steps = steps_from_instructions(&instructions);
                // TomTom's travel time already contains its own delay estimate;
                // keep the free-flow baseline so one adjustment applies
                let baseline = (route.summary.travel_time_in_seconds
                    - route.summary.traffic_delay_in_seconds)
                    .max(0.0);

                Route::new(polyline, route.summary.length_in_meters, baseline, steps, i > 0)
            })
            .collect())
    }
}

fn steps_from_instructions(instructions: &[TomTomInstruction]) -> Vec<RouteStep> {
    instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| {
            // Offsets are cumulative from the start; a step covers the stretch
            // up to the next maneuver.
            let distance_meters = instructions
                .get(index + 1)
                .map(|next| (next.route_offset_in_meters - instruction.route_offset_in_meters).max(0.0))
                .unwrap_or(0.0);
            let (maneuver_type, maneuver_modifier) = maneuver(&instruction.maneuver);

            RouteStep {
                index,
                instruction_text: instruction.message.clone(),
                distance_meters,
                maneuver_type,
                maneuver_modifier,
                street_name: instruction.street.clone().filter(|s| !s.is_empty()),
                location: instruction.point.into(),
                polyline_index: instruction.point_index,
            }
        })
        .collect()
}

fn side(code: &str) -> Option<String> {
    if code.ends_with("LEFT") {
        Some("left".to_string())
    } else if code.ends_with("RIGHT") {
        Some("right".to_string())
    } else {
        None
    }
}

/// Maps TomTom maneuver codes onto the ORS-style type/modifier vocabulary.
fn maneuver(code: &str) -> (String, Option<String>) {
    let (kind, modifier) = match code {
        "DEPART" => ("depart", None),
        "ARRIVE" | "ARRIVE_LEFT" | "ARRIVE_RIGHT" => ("arrive", side(code)),
        "STRAIGHT" => ("continue", Some("straight".to_string())),
        "TURN_LEFT" | "TURN_RIGHT" => ("turn", side(code)),
        "BEAR_LEFT" | "BEAR_RIGHT" => ("turn", side(code).map(|s| format!("slight {s}"))),
        "SHARP_LEFT" | "SHARP_RIGHT" => ("turn", side(code).map(|s| format!("sharp {s}"))),
        "KEEP_LEFT" | "KEEP_RIGHT" => ("fork", side(code)),
        "MAKE_UTURN" | "TRY_MAKE_UTURN" => ("uturn", None),
        "ENTER_MOTORWAY" | "ENTER_FREEWAY" | "ENTER_HIGHWAY" => ("merge", None),
        "TAKE_EXIT" | "MOTORWAY_EXIT_LEFT" | "MOTORWAY_EXIT_RIGHT" => ("off ramp", side(code)),
        c if c.starts_with("ROUNDABOUT") => ("roundabout", side(c)),
        "" => ("continue", None),
        other => return (other.to_lowercase().replace('_', " "), None),
    };
    (kind.to_string(), modifier)
}
