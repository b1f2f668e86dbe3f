// src/services/geo.rs
// DOCUMENTATION: Distance helpers for proximity search and duplicate detection
// PURPOSE: Great-circle distance between WGS84 points (x = longitude, y = latitude)

use geo_types::Point;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance between two coordinates in kilometers
/// Uses Haversine formula
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let (lat1, lon1) = (a.y(), a.x());
    let (lat2, lon2) = (b.y(), b.x());

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn haversine_m(a: Point<f64>, b: Point<f64>) -> f64 {
    haversine_km(a, b) * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = Point::new(-3.1883, 55.9533);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_edinburgh_to_leith() {
        // Waverley to the Shore, about 3 km
        let waverley = Point::new(-3.1883, 55.9521);
        let shore = Point::new(-3.1700, 55.9762);
        let d = haversine_km(waverley, shore);
        assert!(d > 2.8 && d < 3.3, "got {}", d);
    }

    #[test]
    fn test_metres_scale() {
        let a = Point::new(-3.2, 55.95);
        let b = Point::new(-3.2, 55.9502);
        let m = haversine_m(a, b);
        assert!(m > 20.0 && m < 25.0, "got {}", m);
    }
}
