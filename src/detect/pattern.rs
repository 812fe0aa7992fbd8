//! Driver hotspot and depot spike detection.

use crate::config::DetectionConfig;
use crate::detect::{group_by, Group};
use crate::model::{CleanEvent, PatternFinding, PatternKind, Severity};

/// Flag driver and depot groups whose exception rate crosses the configured
/// thresholds. Driver findings come first, then depot findings, each in
/// first-appearance order of their group key.
pub fn detect_patterns(events: &[CleanEvent], cfg: &DetectionConfig) -> Vec<PatternFinding> {
    if events.is_empty() {
        return Vec::new();
    }

    let drivers = group_by(events, |e| e.driver_id.as_str());
    let depots = group_by(events, |e| e.depot_id.as_str());

    let driver_findings = drivers.iter().filter_map(|g| driver_hotspot(g, cfg));
    let depot_findings = depots.iter().filter_map(|g| depot_spike(g, cfg));

    driver_findings.chain(depot_findings).collect()
}

fn driver_hotspot(group: &Group<'_>, cfg: &DetectionConfig) -> Option<PatternFinding> {
    let rate = group.rate();
    if rate <= cfg.driver_rate_threshold {
        return None;
    }

    Some(PatternFinding {
        id: format!("driver-{}", group.key),
        kind: PatternKind::DriverHotspot,
        description: format!(
            "Driver {} has an exception rate of {:.1}% ({} of {} deliveries)",
            group.key,
            rate * 100.0,
            group.exception_count(),
            group.events.len()
        ),
        severity: Severity::from_rate(rate),
        confidence: clamp(rate, cfg.driver_confidence_floor),
        rate,
        drivers: vec![group.key.to_string()],
        depot_id: group.events.first().map(|e| e.depot_id.clone()),
    })
}

fn depot_spike(group: &Group<'_>, cfg: &DetectionConfig) -> Option<PatternFinding> {
    let rate = group.rate();
    if rate <= cfg.depot_rate_threshold {
        return None;
    }

    let mut drivers: Vec<String> = Vec::new();
    for e in &group.events {
        if !drivers.iter().any(|d| d == &e.driver_id) {
            drivers.push(e.driver_id.clone());
        }
    }

    Some(PatternFinding {
        id: format!("depot-{}", group.key),
        kind: PatternKind::DepotSpike,
        description: format!(
            "Depot {} exception rate is {:.1}% across {} drivers",
            group.key,
            rate * 100.0,
            drivers.len()
        ),
        severity: Severity::from_rate(rate + cfg.depot_severity_offset),
        confidence: clamp(rate + cfg.depot_confidence_offset, cfg.depot_confidence_floor),
        rate,
        drivers,
        depot_id: Some(group.key.to_string()),
    })
}

/// Clamp into `[floor, 1.0]`.
fn clamp(v: f64, floor: f64) -> f64 {
    v.max(floor).min(1.0)
}
