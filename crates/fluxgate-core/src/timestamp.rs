//! Event timestamp parsing.
//!
//! `dateTime` values are accepted in RFC 3339 first, then in the legacy
//! producer format whose zone offset has no colon (`2020-04-08T00:23:00+0000`).

use chrono::{DateTime, Utc};

const LEGACY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parse an event timestamp, normalized to UTC.
///
/// Tries RFC 3339, then the legacy offset format. Returns `None` when the
/// value matches neither.
pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    DateTime::parse_from_str(value, LEGACY_FORMAT)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
