//! Great-circle distances and simple geodesic helpers.

use crate::coord::Coordinate;

/// Mean earth radius in meters (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A plain latitude/longitude pair in degrees, used where a position is
/// reported rather than keyed (edge centers, node output).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Haversine distance in meters between two degree positions.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Distance in meters between two rounded coordinates.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_m(a.lat(), a.lon(), b.lat(), b.lon())
}

/// Sum of segment distances along a polyline. Zero for fewer than two
/// points.
pub fn polyline_length_m(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_m(&pair[0], &pair[1]))
        .sum()
}

/// Arithmetic midpoint of two coordinates, in degrees. Good enough for the
/// edge-center estimate; not a geodesic midpoint.
pub fn midpoint(a: &Coordinate, b: &Coordinate) -> GeoPoint {
    GeoPoint {
        lat: (a.lat() + b.lat()) / 2.0,
        lon: (a.lon() + b.lon()) / 2.0,
    }
}
