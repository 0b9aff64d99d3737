//! Great-circle geometry on a spherical Earth.

use crate::types::Position;

/// Mean Earth radius in meters used by [`haversine_m`].
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two positions, in meters.
///
/// `a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)`, `d = 2R · atan2(√a, √(1−a))`.
pub fn haversine_m(from: &Position, to: &Position) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Position `meters` due north of `origin` along its meridian.
///
/// Handy for building fixtures at an exact haversine distance.
pub fn offset_north(origin: &Position, meters: f64) -> Position {
    Position::new(origin.latitude + (meters / EARTH_RADIUS_M).to_degrees(), origin.longitude)
}
