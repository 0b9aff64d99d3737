//! Wall-clock helpers.

use chrono::{SecondsFormat, Utc};

/// Current UTC time as ISO-8601 with millisecond precision and a `Z` suffix,
/// e.g. `2024-05-01T09:30:00.123Z`.
#[inline]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
