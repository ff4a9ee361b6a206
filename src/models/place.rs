use crate::models::Coordinate;
use serde::{Deserialize, Serialize};

/// Geocoding search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub label: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Place {
    pub fn location(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Live traffic reading at a point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FlowSample {
    pub current_speed_kmh: f64,
    pub free_flow_speed_kmh: f64,
    /// Provider confidence in [0, 1]
    pub confidence: f64,
}
