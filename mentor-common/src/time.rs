//! Timestamp utilities

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};

/// Fallback layouts tried after RFC 3339, in order.
///
/// The database/binding pair does not promise one text rendering of
/// `timestamptz`: `row_to_json` emits RFC 3339, older drivers emit a fixed
/// six-digit fraction with an hour-only offset, and the plain text cast uses a
/// space instead of `T`.
const FALLBACK_LAYOUTS: &[&str] = &[
    // 2024-03-01T10:15:30.123456+00
    "%Y-%m-%dT%H:%M:%S%.6f%#z",
    // 2024-03-01 10:15:30.123456+00
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a database timestamp rendered as text
///
/// RFC 3339 is tried first (any fraction length, `Z` or `±hh:mm`), then each
/// entry of `FALLBACK_LAYOUTS`. Fails only when no layout matches.
pub fn parse_db_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    FALLBACK_LAYOUTS
        .iter()
        .find_map(|layout| DateTime::<FixedOffset>::parse_from_str(s, layout).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidInput(format!("unrecognized timestamp layout: {:?}", s)))
}
