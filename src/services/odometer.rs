use crate::constants::{ODOMETER_MAX_DELTA_KM, ODOMETER_MIN_DELTA_KM};
use crate::models::Coordinate;

/// Accumulates driven distance from consecutive positions.
///
/// Deltas of 5 m or less are GPS jitter; 1 km or more between two fixes is a
/// jump (tunnel exit, cold start) and is not counted either. The previous fix
/// always advances.
#[derive(Debug, Default, Clone)]
pub struct Odometer {
    previous: Option<Coordinate>,
}

impl Odometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kilometers to record for this fix, if any.
    pub fn record(&mut self, position: Coordinate) -> Option<f64> {
        let previous = self.previous.replace(position)?;
        let km = previous.distance_to(&position) / 1000.0;
        (km > ODOMETER_MIN_DELTA_KM && km < ODOMETER_MAX_DELTA_KM).then_some(km)
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_first_fix_records_nothing() {
        let mut odometer = Odometer::new();
        assert!(odometer.record(c(52.0, 5.0)).is_none());
    }

    #[test]
    fn test_counts_plausible_delta() {
        let mut odometer = Odometer::new();
        odometer.record(c(52.0, 5.0));
        // ~111 m north
        let km = odometer.record(c(52.001, 5.0)).unwrap();
        assert!((km - 0.111).abs() < 0.002, "km = {km}");
    }

    #[test]
    fn test_ignores_jitter_and_jumps() {
        let mut odometer = Odometer::new();
        odometer.record(c(52.0, 5.0));
        // ~1 m
        assert!(odometer.record(c(52.00001, 5.0)).is_none());
        // ~11 km
        assert!(odometer.record(c(52.1, 5.0)).is_none());
        // previous fix advanced to the jump target
        assert!(odometer.record(c(52.101, 5.0)).is_some());
    }

    #[test]
    fn test_reset_forgets_previous_fix() {
        let mut odometer = Odometer::new();
        odometer.record(c(52.0, 5.0));
        odometer.reset();
        assert!(odometer.record(c(52.001, 5.0)).is_none());
    }
}
