//! Great-circle distance.

use crate::types::Coordinate;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine great-circle distance between two points, in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = Coordinate::new(37.5665, 126.978);
        assert!(haversine_m(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_short_north_offset() {
        // 0.0005° of latitude is ~55.6m anywhere on the sphere.
        let d = haversine_m(Coordinate::new(37.5, 126.9), Coordinate::new(37.5005, 126.9));
        assert!((d - 55.6).abs() < 0.5, "got {d}");
    }

    #[test]
    fn test_seoul_city_hall_to_gangnam() {
        // City Hall to Gangnam station is roughly 8.8km.
        let d = haversine_m(
            Coordinate::new(37.5663, 126.9779),
            Coordinate::new(37.4979, 127.0276),
        );
        assert!((d - 8_800.0).abs() < 300.0, "got {d}");
    }

    #[test]
    fn test_symmetric() {
        let a = Coordinate::new(37.50, 126.90);
        let b = Coordinate::new(37.51, 126.91);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
    }
}
