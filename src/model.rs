//! Wire and domain types shared by the engine, the HTTP layer and the client.
//!
//! Raw events arrive from the dashboard in whatever shape its upload/mock
//! pipeline produced, so [`RawEvent`] is deliberately lenient. The cleaner
//! turns them into [`CleanEvent`]s, which carry the invariants every detector
//! relies on.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One delivery outcome as submitted by the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub driver_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub depot_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub timestamp: Option<String>,
    /// Anything truthy-looking; normalised by the cleaner.
    #[serde(default)]
    pub is_concession: serde_json::Value,
    #[serde(default, rename = "type", deserialize_with = "de_lenient_string")]
    pub kind: Option<String>,
}

/// Accept strings and numbers as identifiers, treat everything else as absent.
fn de_lenient_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Optional restriction of the working set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
}

impl Filters {
    pub fn depot(&self) -> Option<&str> {
        self.depot_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn driver(&self) -> Option<&str> {
        self.driver_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Request body of the analysis endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub events: Option<Vec<RawEvent>>,
    #[serde(default)]
    pub filters: Option<Filters>,
}

impl AnalyzeRequest {
    pub fn new(events: Vec<RawEvent>, filters: Filters) -> Self {
        Self {
            events: Some(events),
            filters: Some(filters),
        }
    }

    /// True when the request carries no events at all (input rejected).
    pub fn is_empty(&self) -> bool {
        self.events.as_ref().map_or(true, |e| e.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Cleaned events
// ---------------------------------------------------------------------------

/// A validated event: non-empty driver and depot, parsed timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanEvent {
    pub id: String,
    pub driver_id: String,
    pub depot_id: String,
    #[serde(serialize_with = "ser_canonical_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub is_concession: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CleanEvent {
    /// Canonical ISO-8601 rendering: UTC, millisecond precision, `Z` suffix.
    pub fn canonical_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn ser_canonical_timestamp<S>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DriverHotspot,
    DepotSpike,
}

/// Severity bands, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Band a rate: `>= 0.18` critical, `>= 0.12` high, `>= 0.07` medium.
    pub fn from_rate(r: f64) -> Self {
        if r >= 0.18 {
            Severity::Critical
        } else if r >= 0.12 {
            Severity::High
        } else if r >= 0.07 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => f.pad("low"),
            Severity::Medium => f.pad("medium"),
            Severity::High => f.pad("high"),
            Severity::Critical => f.pad("critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFinding {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
    /// Underlying group exception rate.
    pub rate: f64,
    pub drivers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Increasing => f.pad("increasing"),
            TrendDirection::Decreasing => f.pad("decreasing"),
            TrendDirection::Stable => f.pad("stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendFinding {
    pub driver_id: String,
    pub direction: TrendDirection,
    /// Percentage points, two decimals.
    pub change: f64,
    pub significance: f64,
}

/// Output of one `analyze` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub patterns: Vec<PatternFinding>,
    pub trends: Vec<TrendFinding>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.trends.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePatternKind {
    WeekdayConcentration,
    PeakHour,
    WeekendDifference,
}

/// A time-of-week concentration of exception events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePattern {
    #[serde(rename = "type")]
    pub kind: TimePatternKind,
    pub description: String,
    pub confidence: f64,
    pub details: serde_json::Value,
}

/// Round to `places` decimals; never yields negative zero.
pub(crate) fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let r = (v * factor).round() / factor;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
