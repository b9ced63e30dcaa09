// src/matching/geo.rs

use crate::config::EARTH_RADIUS_KM;

/// Great-circle distance between two coordinate pairs, in kilometers.
///
/// Returns `None` when either point is missing or not finite: an unknown
/// distance is a non-contributing signal, never "far" or "near".
pub fn distance_km(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<f64> {
    let (lat1, lon1) = a?;
    let (lat2, lon2) = b?;
    if ![lat1, lon1, lat2, lon2].iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(haversine_km(lat1, lon1, lat2, lon2))
}

/// Haversine formula over a spherical Earth.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
