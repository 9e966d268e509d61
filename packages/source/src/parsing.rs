//! Shared parsing utilities for Socrata permit records.
//!
//! Socrata returns every column as a JSON string, but coordinates and
//! numbers occasionally arrive as native JSON numbers, so every helper
//! accepts both.

use chrono::{NaiveDate, NaiveDateTime};

/// Parses a Socrata floating timestamp (ISO 8601 with optional fractional
/// seconds, no zone).
#[must_use]
pub fn parse_socrata_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Parses a Socrata timestamp or bare `YYYY-MM-DD` date into a calendar
/// date, discarding the time of day.
#[must_use]
pub fn parse_socrata_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    parse_socrata_datetime(s)
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Reads a coordinate from a JSON string or number.
#[must_use]
pub fn parse_coordinate(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Accepts a lat/lng pair only if both are present, non-zero, and within
/// WGS84 range.
#[must_use]
pub fn valid_lat_lng(lat: Option<f64>, lng: Option<f64>) -> Option<(f64, f64)> {
    let latitude = lat?;
    let longitude = lng?;
    if latitude == 0.0
        || longitude == 0.0
        || !(-90.0..=90.0).contains(&latitude)
        || !(-180.0..=180.0).contains(&longitude)
    {
        return None;
    }
    Some((latitude, longitude))
}

/// Renders a scalar JSON value as text. Null, arrays, and objects yield
/// `None`.
#[must_use]
pub fn value_to_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}
