//! Per-driver half-over-half trend classification.

use crate::config::DetectionConfig;
use crate::detect::{exception_rate, group_by};
use crate::model::{round_to, CleanEvent, TrendDirection, TrendFinding};

/// One finding per distinct driver, in first-appearance order.
///
/// Each driver's events are sorted by timestamp (stable for ties) and split
/// at `n / 2`; the trend is the later half's exception rate minus the
/// earlier half's.
pub fn detect_trends(events: &[CleanEvent], cfg: &DetectionConfig) -> Vec<TrendFinding> {
    group_by(events, |e| e.driver_id.as_str())
        .into_iter()
        .map(|mut group| {
            group.events.sort_by_key(|e| e.timestamp);
            let (first, second) = group.events.split_at(group.events.len() / 2);
            let change = exception_rate(second) - exception_rate(first);

            TrendFinding {
                driver_id: group.key.to_string(),
                direction: classify(change, cfg.trend_change_threshold),
                change: round_to(change * 100.0, 2),
                significance: round_to((change * 10.0).abs(), 2),
            }
        })
        .collect()
}

fn classify(change: f64, threshold: f64) -> TrendDirection {
    if change > threshold {
        TrendDirection::Increasing
    } else if change < -threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}
