//! Meters-to-degrees conversion on the WGS 84 ellipsoid.
//!
//! The pipeline's length thresholds are expressed in degrees because all
//! geometry stays in WGS 84 coordinates. User-facing "meters" values are
//! converted here, at a reference latitude, using the radius of curvature
//! in the meridian and prime vertical.

/// WGS 84 semi-major axis in meters.
const SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS 84 flattening factor.
const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Converts a distance in meters to `(latitude, longitude)` degree
/// deltas at the given reference latitude.
#[must_use]
pub fn meters_to_degrees(meters: f64, reference_lat: f64) -> (f64, f64) {
    let lat_rad = reference_lat.to_radians();

    let e2 = 2.0f64.mul_add(FLATTENING, -(FLATTENING * FLATTENING));
    let sin_sq = lat_rad.sin() * lat_rad.sin();

    // Radius of curvature in the prime vertical.
    let n = SEMI_MAJOR_AXIS_M / (1.0 - e2 * sin_sq).sqrt();
    // Radius of curvature in the meridian.
    let m = SEMI_MAJOR_AXIS_M * (1.0 - e2) / (1.0 - e2 * sin_sq).powf(1.5);

    let lat_deg = (meters / m).to_degrees();
    let lon_deg = (meters / (n * lat_rad.cos())).to_degrees();

    (lat_deg, lon_deg)
}

/// Converts meters to a single degree value usable as an isotropic
/// threshold: the mean of the latitude and longitude deltas.
#[must_use]
pub fn meters_to_degree_threshold(meters: f64, reference_lat: f64) -> f64 {
    let (lat_deg, lon_deg) = meters_to_degrees(meters, reference_lat);
    (lat_deg + lon_deg) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_latitude_is_about_111_km_at_equator() {
        let (lat_deg, lon_deg) = meters_to_degrees(110_574.0, 0.0);
        assert!((lat_deg - 1.0).abs() < 0.01);
        // At the equator a longitude degree is slightly longer.
        assert!(lon_deg < lat_deg);
    }

    #[test]
    fn longitude_degrees_grow_with_latitude() {
        let (_, lon_equator) = meters_to_degrees(1000.0, 0.0);
        let (_, lon_temperate) = meters_to_degrees(1000.0, 52.0);
        assert!(lon_temperate > lon_equator * 1.5);
    }

    #[test]
    fn four_meters_is_near_the_default_segmentize_threshold() {
        let threshold = meters_to_degree_threshold(4.0, 0.0);
        assert!((threshold - 0.000_04).abs() < 0.000_005);
    }
}
