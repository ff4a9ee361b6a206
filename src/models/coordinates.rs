use serde::{Deserialize, Serialize};

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            ));
        }
        Ok(Coordinate { lat, lng })
    }

    /// Re-checks the range invariant for values that arrived through serde.
    pub fn validate(&self) -> Result<(), String> {
        Coordinate::new(self.lat, self.lng).map(|_| ())
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        crate::geodesy::distance_meters(*self, *other)
    }

    /// Fixed-precision rendering used by cache keys.
    pub fn key_fragment(&self, decimals: usize) -> String {
        format!("{:.*},{:.*}", decimals, self.lat, decimals, self.lng)
    }
}
