//! Great-circle helpers (meters, decimal degrees).

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters. Non-finite input yields `f64::INFINITY`.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if !(lat1.is_finite() && lng1.is_finite() && lat2.is_finite() && lng2.is_finite()) {
        return f64::INFINITY;
    }
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Equirectangular approximation in meters; only accurate for small deltas.
/// Non-finite input yields `f64::INFINITY`.
pub fn equirectangular_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if !(lat1.is_finite() && lng1.is_finite() && lat2.is_finite() && lng2.is_finite()) {
        return f64::INFINITY;
    }
    let mean_lat = (lat1.to_radians() + lat2.to_radians()) / 2.0;
    let x = (lng2 - lng1).to_radians() * mean_lat.cos();
    let y = (lat2 - lat1).to_radians();
    EARTH_RADIUS_M * x.hypot(y)
}

/// Planar distance when both coordinate deltas are within `max_fast_deg`,
/// haversine otherwise.
pub fn distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64, max_fast_deg: f64) -> f64 {
    if (lat2 - lat1).abs() > max_fast_deg || (lng2 - lng1).abs() > max_fast_deg {
        haversine_m(lat1, lng1, lat2, lng2)
    } else {
        equirectangular_m(lat1, lng1, lat2, lng2)
    }
}
