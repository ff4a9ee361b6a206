use crate::models::Coordinate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Axis-aligned lat/lng box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn new(min: Coordinate, max: Coordinate) -> Result<Self, String> {
        min.validate()?;
        max.validate()?;
        if min.lat > max.lat || min.lng > max.lng {
            return Err("bbox minimum must not exceed its maximum".to_string());
        }
        Ok(BoundingBox {
            min_lat: min.lat,
            min_lng: min.lng,
            max_lat: max.lat,
            max_lng: max.lng,
        })
    }

    /// Grows the box outwards to `decimals` places: minimums floor, maximums ceil.
    pub fn rounded_out(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        BoundingBox {
            min_lat: (self.min_lat * factor).floor() / factor,
            min_lng: (self.min_lng * factor).floor() / factor,
            max_lat: (self.max_lat * factor).ceil() / factor,
            max_lng: (self.max_lng * factor).ceil() / factor,
        }
    }

    /// `minLng,minLat,maxLng,maxLat`, the order TomTom expects.
    pub fn to_lng_lat_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lng, self.min_lat, self.max_lng, self.max_lat
        )
    }
}

/// Parses `minLng,minLat,maxLng,maxLat`.
impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format!("Invalid bbox '{}'", s))?;
        match values.as_slice() {
            [min_lng, min_lat, max_lng, max_lat] => BoundingBox::new(
                Coordinate {
                    lat: *min_lat,
                    lng: *min_lng,
                },
                Coordinate {
                    lat: *max_lat,
                    lng: *max_lng,
                },
            ),
            _ => Err(format!(
                "Invalid bbox '{}' (expected minLng,minLat,maxLng,maxLat)",
                s
            )),
        }
    }
}

/// TomTom incident icon category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Unknown,
    Accident,
    Fog,
    DangerousConditions,
    Rain,
    Ice,
    Jam,
    LaneClosed,
    RoadClosed,
    RoadWorks,
    Wind,
    Flooding,
    BrokenDownVehicle,
}

impl IncidentCategory {
    pub fn from_icon_category(code: u8) -> Self {
        match code {
            1 => IncidentCategory::Accident,
            2 => IncidentCategory::Fog,
            3 => IncidentCategory::DangerousConditions,
            4 => IncidentCategory::Rain,
            5 => IncidentCategory::Ice,
            6 => IncidentCategory::Jam,
            7 => IncidentCategory::LaneClosed,
            8 => IncidentCategory::RoadClosed,
            9 => IncidentCategory::RoadWorks,
            10 => IncidentCategory::Wind,
            11 => IncidentCategory::Flooding,
            14 => IncidentCategory::BrokenDownVehicle,
            _ => IncidentCategory::Unknown,
        }
    }
}

/// Road incident reported by the traffic provider, located at its first point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficIncident {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub category: IncidentCategory,
    pub description: String,
    /// Magnitude of delay, 0 (unknown) to 4 (road closed)
    pub severity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}
