//! Great-circle helpers shared by progress tracking, proximity matching and
//! driven-distance bookkeeping.

use crate::models::{Coordinate, ProgressResult};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Nearest polyline vertex to `position`, by linear scan. First vertex wins
/// ties; `None` only for an empty path.
pub fn nearest_point_on_path(position: Coordinate, path: &[Coordinate]) -> Option<ProgressResult> {
    let mut best: Option<ProgressResult> = None;

    for (index, vertex) in path.iter().enumerate() {
        let distance = distance_meters(position, *vertex);
        let closer = best
            .as_ref()
            .map_or(true, |current| distance < current.distance_meters);
        if closer {
            best = Some(ProgressResult {
                nearest_index: index,
                distance_meters: distance,
                coordinate: *vertex,
            });
        }
    }

    best
}

/// Total length of a path in meters.
pub fn path_length_meters(path: &[Coordinate]) -> f64 {
    path_length_from(path, 0)
}

/// Length of the path suffix starting at vertex `start`, in meters.
pub fn path_length_from(path: &[Coordinate], start: usize) -> f64 {
    path.get(start..)
        .unwrap_or(&[])
        .windows(2)
        .map(|w| distance_meters(w[0], w[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_identical_points_are_zero_apart() {
        let dam = c(52.3731, 4.8926);
        assert_eq!(distance_meters(dam, dam), 0.0);
    }

    #[test]
    fn test_amsterdam_utrecht_distance() {
        let amsterdam = c(52.3676, 4.9041);
        let utrecht = c(52.0907, 5.1214);
        let d = distance_meters(amsterdam, utrecht);
        // Roughly 34 km as the crow flies
        assert!((d - 34_000.0).abs() < 1_500.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = c(51.9244, 4.4777);
        let b = c(52.0705, 4.3007);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_point_empty_path() {
        assert!(nearest_point_on_path(c(52.0, 5.0), &[]).is_none());
    }

    #[test]
    fn test_nearest_point_picks_closest_vertex() {
        let path = vec![c(52.0, 5.0), c(52.001, 5.0), c(52.002, 5.0)];
        let result = nearest_point_on_path(c(52.0011, 5.0001), &path).unwrap();
        assert_eq!(result.nearest_index, 1);
        assert_eq!(result.coordinate, path[1]);
        assert!(result.distance_meters < 20.0);
    }

    #[test]
    fn test_nearest_point_tie_prefers_first_vertex() {
        let duplicate = vec![c(52.0, 5.0), c(52.0, 5.0)];
        let result = nearest_point_on_path(c(52.0, 5.0), &duplicate).unwrap();
        assert_eq!(result.nearest_index, 0);
    }

    #[test]
    fn test_path_length_suffix() {
        let path = vec![c(52.0, 5.0), c(52.001, 5.0), c(52.002, 5.0)];
        let total = path_length_meters(&path);
        let tail = path_length_from(&path, 1);
        let leg = distance_meters(path[0], path[1]);
        assert!((total - tail - leg).abs() < 1e-6);
        assert_eq!(path_length_from(&path, 2), 0.0);
        assert_eq!(path_length_from(&path, 10), 0.0);
    }
}
