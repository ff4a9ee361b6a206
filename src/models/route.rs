use crate::models::Coordinate;
use geo::{BoundingRect, LineString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Routing objective chosen by the driver.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutePreference {
    #[default]
    Fastest,
    Shortest,
    Scenic,
    AvoidTolls,
    Balanced,
}

impl RoutePreference {
    /// Parses a preference, falling back to `Fastest` for anything unknown.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::debug!("Unknown route preference '{}', using fastest", s);
            RoutePreference::Fastest
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePreference::Fastest => "fastest",
            RoutePreference::Shortest => "shortest",
            RoutePreference::Scenic => "scenic",
            RoutePreference::AvoidTolls => "avoid_tolls",
            RoutePreference::Balanced => "balanced",
        }
    }
}

impl fmt::Display for RoutePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoutePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fastest" => Ok(RoutePreference::Fastest),
            "shortest" => Ok(RoutePreference::Shortest),
            "scenic" => Ok(RoutePreference::Scenic),
            "avoid_tolls" => Ok(RoutePreference::AvoidTolls),
            "balanced" => Ok(RoutePreference::Balanced),
            _ => Err(format!("Invalid route preference: '{}'", s)),
        }
    }
}

impl<'de> Deserialize<'de> for RoutePreference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RoutePreference::parse_lenient(&raw))
    }
}

/// Which external routing provider serves a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    /// OpenRouteService
    #[default]
    Primary,
    /// TomTom Routing
    Secondary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStep {
    pub index: usize,
    pub instruction_text: String,
    pub distance_meters: f64,
    pub maneuver_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver_modifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    /// Where the maneuver happens
    pub location: Coordinate,
    /// Polyline vertex at which the maneuver starts
    pub polyline_index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl RouteBounds {
    pub fn of(path: &[Coordinate]) -> Option<Self> {
        let line: LineString<f64> = path.iter().map(|c| (c.lng, c.lat)).collect::<Vec<_>>().into();
        line.bounding_rect().map(|rect| RouteBounds {
            min_lat: rect.min().y,
            min_lng: rect.min().x,
            max_lat: rect.max().y,
            max_lng: rect.max().x,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: Uuid,
    /// Lat-lng ordered path
    pub polyline: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Duration with the traffic multiplier applied, never below `duration_seconds`
    pub adjusted_duration_seconds: f64,
    pub traffic_multiplier: f64,
    pub steps: Vec<RouteStep>,
    pub is_alternative: bool,
    pub average_speed_kmh: f64,
    pub has_live_traffic_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<RouteBounds>,
}

impl Route {
    /// Builds a route with no traffic adjustment applied yet.
    pub fn new(
        polyline: Vec<Coordinate>,
        distance_meters: f64,
        duration_seconds: f64,
        steps: Vec<RouteStep>,
        is_alternative: bool,
    ) -> Self {
        let average_speed_kmh = if duration_seconds > 0.0 {
            (distance_meters / duration_seconds * 3.6).round()
        } else {
            0.0
        };
        let bounds = RouteBounds::of(&polyline);

        Route {
            id: Uuid::new_v4(),
            polyline,
            distance_meters,
            duration_seconds,
            adjusted_duration_seconds: duration_seconds,
            traffic_multiplier: 1.0,
            steps,
            is_alternative,
            average_speed_kmh,
            has_live_traffic_data: false,
            bounds,
        }
    }

    /// Applies a traffic multiplier. Values are clamped so the adjusted duration
    /// stays within `[duration, 2.5 * duration]`.
    pub fn with_traffic(mut self, multiplier: f64, live: bool) -> Self {
        let multiplier = multiplier.clamp(1.0, crate::constants::TRAFFIC_MAX_MULTIPLIER);
        self.traffic_multiplier = multiplier;
        self.adjusted_duration_seconds = self.duration_seconds * multiplier;
        self.has_live_traffic_data = live;
        self
    }

    pub fn destination(&self) -> Option<Coordinate> {
        self.polyline.last().copied()
    }
}

// Request/Response types for API endpoints

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    #[serde(default)]
    pub preference: RoutePreference,
    #[serde(default = "default_include_traffic")]
    pub include_traffic: bool,
    #[serde(default)]
    pub provider: ProviderChoice,
}

fn default_include_traffic() -> bool {
    true
}

impl RouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        self.origin.validate().map_err(|e| format!("origin: {}", e))?;
        self.destination
            .validate()
            .map_err(|e| format!("destination: {}", e))?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub routes: Vec<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_preference_from_str() {
        assert_eq!(
            "fastest".parse::<RoutePreference>().unwrap(),
            RoutePreference::Fastest
        );
        assert_eq!(
            "AVOID_TOLLS".parse::<RoutePreference>().unwrap(),
            RoutePreference::AvoidTolls
        );
        assert_eq!(
            "avoid-tolls".parse::<RoutePreference>().unwrap(),
            RoutePreference::AvoidTolls
        );
        assert!("teleport".parse::<RoutePreference>().is_err());
    }

    #[test]
    fn test_unknown_preference_falls_back_to_fastest() {
        assert_eq!(
            RoutePreference::parse_lenient("teleport"),
            RoutePreference::Fastest
        );
        let p: RoutePreference = serde_json::from_str("\"teleport\"").unwrap();
        assert_eq!(p, RoutePreference::Fastest);
        let p: RoutePreference = serde_json::from_str("\"scenic\"").unwrap();
        assert_eq!(p, RoutePreference::Scenic);
    }

    #[test]
    fn test_preference_display_round_trips_through_serde() {
        let json = serde_json::to_string(&RoutePreference::AvoidTolls).unwrap();
        assert_eq!(json, "\"avoid_tolls\"");
        assert_eq!(RoutePreference::AvoidTolls.to_string(), "avoid_tolls");
    }

    #[test]
    fn test_route_new_derives_speed_and_bounds() {
        let route = Route::new(
            vec![c(52.0, 5.0), c(52.1, 5.2), c(52.05, 4.9)],
            45_000.0,
            1_800.0,
            vec![],
            false,
        );
        assert_eq!(route.average_speed_kmh, 90.0);
        assert_eq!(route.adjusted_duration_seconds, 1_800.0);
        let bounds = route.bounds.unwrap();
        assert_eq!(bounds.min_lat, 52.0);
        assert_eq!(bounds.max_lat, 52.1);
        assert_eq!(bounds.min_lng, 4.9);
        assert_eq!(bounds.max_lng, 5.2);
    }

    #[test]
    fn test_zero_duration_route_has_zero_speed() {
        let route = Route::new(vec![], 0.0, 0.0, vec![], false);
        assert_eq!(route.average_speed_kmh, 0.0);
        assert!(route.bounds.is_none());
    }

    #[test]
    fn test_with_traffic_clamps_multiplier() {
        let route = Route::new(vec![], 1_000.0, 100.0, vec![], false);
        let slow = route.clone().with_traffic(4.0, true);
        assert_eq!(slow.adjusted_duration_seconds, 250.0);
        assert!(slow.has_live_traffic_data);

        let fast = route.with_traffic(0.5, true);
        assert_eq!(fast.adjusted_duration_seconds, 100.0);
        assert_eq!(fast.traffic_multiplier, 1.0);
    }

    #[test]
    fn test_route_request_defaults() {
        let req: RouteRequest = serde_json::from_str(
            r#"{"origin": {"lat": 52.37, "lng": 4.90}, "destination": {"lat": 52.09, "lng": 5.12}}"#,
        )
        .unwrap();
        assert_eq!(req.preference, RoutePreference::Fastest);
        assert!(req.include_traffic);
        assert_eq!(req.provider, ProviderChoice::Primary);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_route_request_rejects_out_of_range() {
        let req: RouteRequest = serde_json::from_str(
            r#"{"origin": {"lat": 152.37, "lng": 4.90}, "destination": {"lat": 52.09, "lng": 5.12}}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
