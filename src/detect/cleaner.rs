//! Validation and normalisation of raw events.
//!
//! Malformed records are excluded silently: they are neither reported,
//! counted nor logged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::model::{CleanEvent, Filters, RawEvent};

/// Drop invalid events, apply `filters`, and normalise the rest.
pub fn clean(events: &[RawEvent], filters: &Filters) -> Vec<CleanEvent> {
    let depot = filters.depot();
    let driver = filters.driver();

    events
        .iter()
        .filter_map(normalize)
        .filter(|e| depot.map_or(true, |d| e.depot_id == d))
        .filter(|e| driver.map_or(true, |d| e.driver_id == d))
        .collect()
}

fn normalize(raw: &RawEvent) -> Option<CleanEvent> {
    let driver_id = non_empty(raw.driver_id.as_deref())?;
    let depot_id = non_empty(raw.depot_id.as_deref())?;
    let timestamp = parse_timestamp(non_empty(raw.timestamp.as_deref())?)?;

    Some(CleanEvent {
        id: raw.id.clone().unwrap_or_default(),
        driver_id: driver_id.to_string(),
        depot_id: depot_id.to_string(),
        timestamp,
        is_concession: truthy(&raw.is_concession),
        kind: raw.kind.clone(),
    })
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}
