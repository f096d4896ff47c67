//! Great-circle distance on a spherical Earth.

/// Mean Earth radius (IUGG) in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Haversine distance in metres between two latitude/longitude pairs given in
/// decimal degrees.
///
/// Numerically stable for short distances, which is what the 100 m movement
/// threshold needs.
///
/// ```
/// use past_port::location::haversine_distance;
///
/// let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
/// assert!((d - 111_195.08).abs() < 1.0);
/// ```
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards against a > 1.0 from rounding on near-antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(haversine_distance(40.7128, -74.0060, 40.7128, -74.0060), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        // π/180 × R
        let d = haversine_distance(10.0, 20.0, 11.0, 20.0);
        assert!((d - 111_195.08).abs() < 1.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = haversine_distance(51.5007, -0.1246, 48.8584, 2.2945);
        let b = haversine_distance(48.8584, 2.2945, 51.5007, -0.1246);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn london_to_paris() {
        // Big Ben → Eiffel Tower, ~340.6 km
        let d = haversine_distance(51.5007, -0.1246, 48.8584, 2.2945);
        assert!((d - 340_600.0).abs() < 2_000.0, "got {d}");
    }

    #[test]
    fn antipodes_do_not_produce_nan() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn nearby_points_under_threshold() {
        let d = haversine_distance(40.7128, -74.0060, 40.7129, -74.0061);
        assert!(d < 100.0, "got {d}");
    }

    #[test]
    fn farther_points_over_threshold() {
        let d = haversine_distance(40.7128, -74.0060, 40.7150, -74.0080);
        assert!(d > 100.0, "got {d}");
    }
}
