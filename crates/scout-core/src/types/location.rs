//! Position samples, resolved addresses and the upload body.

use serde::{Deserialize, Serialize};

/// City placeholder used until a reverse geocode succeeds.
pub const UNKNOWN_CITY: &str = "Unknown City";

/// Street placeholder used until a reverse geocode succeeds.
pub const UNKNOWN_STREET: &str = "Unknown Street";

/// A single device position fix, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to `other` in meters.
    #[inline]
    pub fn distance_to(&self, other: &Position) -> f64 {
        crate::geo::haversine_m(self, other)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Human-readable address for the current position.
///
/// Starts at the "Unknown" placeholders and is only ever replaced by a
/// successful lookup, never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub city: String,
    pub street: String,
}

impl ResolvedAddress {
    pub fn new(city: impl Into<String>, street: impl Into<String>) -> Self {
        Self { city: city.into(), street: street.into() }
    }

    /// Whether this is still the initial placeholder.
    pub fn is_unknown(&self) -> bool {
        self.city == UNKNOWN_CITY && self.street == UNKNOWN_STREET
    }
}

impl Default for ResolvedAddress {
    fn default() -> Self {
        Self::new(UNKNOWN_CITY, UNKNOWN_STREET)
    }
}

impl std::fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.street, self.city)
    }
}

/// JSON body of `POST {base_url}/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    pub agent_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// ISO-8601 UTC, e.g. `2024-05-01T09:30:00.123Z`.
    pub timestamp: String,
}

impl LocationReport {
    /// Build a report for `position`, stamped with the current time.
    pub fn now(agent_id: &str, position: Position) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            latitude: position.latitude,
            longitude: position.longitude,
            timestamp: crate::time_util::now_iso8601(),
        }
    }
}
