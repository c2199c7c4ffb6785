//! Join-key and timestamp normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ReconError;

/// Vendor timestamp shape, e.g. `2024-01-10T00:00:00Z`.
pub const VENDOR_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
/// Report display shape, e.g. `2024-01-10 00:00:00`.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MILLIS_PER_DAY: i64 = 86_400_000;

static ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Trim and lower-case a join key. `None` stays `None`.
pub fn normalize_key(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_lowercase())
}

/// Key used for name matching: `normalize_key`, optionally with
/// parenthetical annotations such as `"Doe (Contractor)"` removed.
pub fn name_key(value: Option<&str>, strip_annotations: bool) -> Option<String> {
    if !strip_annotations {
        return normalize_key(value);
    }
    value.map(|v| ANNOTATION.replace_all(v, "").trim().to_lowercase())
}

/// Keys that are absent or blank never participate in a match.
pub(crate) fn matchable(key: &Option<String>) -> Option<&str> {
    key.as_deref().filter(|k| !k.is_empty())
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Convert a vendor timestamp to the display format.
///
/// Blank input yields `None`. Anything that is not exactly
/// [`VENDOR_TIMESTAMP_FORMAT`] is a `Format` error.
pub fn normalize_timestamp(
    source: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<String>, ReconError> {
    let raw = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };
    let parsed = NaiveDateTime::parse_from_str(raw, VENDOR_TIMESTAMP_FORMAT)
        .map_err(|_| ReconError::format(source, field, raw))?;
    Ok(Some(parsed.format(DISPLAY_TIMESTAMP_FORMAT).to_string()))
}

/// Parse a loosely formatted timestamp. Naive forms are taken as UTC.
pub fn parse_relaxed(value: &str) -> Option<DateTime<Utc>> {
    let v = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(v, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole days between `last_seen` and `now`, floored.
///
/// A `last_seen` later than `now` gives a negative count.
pub fn stale_days(
    source: &str,
    last_seen: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<i64>, ReconError> {
    let raw = match last_seen {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(None),
    };
    let then = parse_relaxed(raw).ok_or_else(|| ReconError::format(source, "last_seen", raw))?;
    Ok(Some((now - then).num_milliseconds().div_euclid(MILLIS_PER_DAY)))
}
