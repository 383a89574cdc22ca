//! Lenient accessors over raw backend JSON.
//!
//! The backend wraps and names the same data differently per endpoint, so
//! every field read goes through an ordered list of candidate keys tried in
//! sequence. All helpers are total: they return `None` instead of failing.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Returns the first present, non-null value among `keys`.
#[must_use]
pub fn first_value<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = obj.as_object()?;
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

/// Coerces a scalar JSON value to a display string.
///
/// Numeric ids arrive as numbers on some endpoints and strings on others.
#[must_use]
pub fn as_display_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present value among `keys`, coerced to a string.
#[must_use]
pub fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    first_value(obj, keys).and_then(as_display_string)
}

/// Like [`first_string`], but empty and whitespace-only strings count as
/// absent so the caller's fallback chain keeps going.
#[must_use]
pub fn first_nonempty_string(obj: &Value, keys: &[&str]) -> Option<String> {
    let map = obj.as_object()?;
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(as_display_string)
        .find(|s| !s.trim().is_empty())
}

#[must_use]
pub fn first_bool(obj: &Value, keys: &[&str]) -> Option<bool> {
    first_value(obj, keys).and_then(Value::as_bool)
}

#[must_use]
pub fn first_array<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a [Value]> {
    first_value(obj, keys).and_then(Value::as_array).map(Vec::as_slice)
}

/// Reads `path[0].path[1]...` as a string, e.g. `user.full_name`.
#[must_use]
pub fn nested_string(obj: &Value, path: &[&str]) -> Option<String> {
    let mut current = obj;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    as_display_string(current).filter(|s| !s.trim().is_empty())
}

// Epoch values above this are taken as milliseconds rather than seconds.
const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Parses a backend timestamp in any of the shapes the API is known to emit:
/// RFC 3339, the ORM default `"%Y-%m-%d %H:%M:%S"` (taken as UTC), or an
/// epoch number in seconds or milliseconds.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(parse_epoch),
        _ => None,
    }
}

#[must_use]
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(epoch) = trimmed.parse::<i64>() {
        return parse_epoch(epoch);
    }

    None
}

fn parse_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value <= 0 {
        return None;
    }
    if value >= EPOCH_MILLIS_CUTOFF {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

/// First present value among `keys`, parsed as a timestamp.
#[must_use]
pub fn first_timestamp(obj: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    first_value(obj, keys).and_then(parse_timestamp)
}
