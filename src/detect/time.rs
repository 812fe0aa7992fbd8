//! Time-of-week concentration of exception events.

use chrono::{Datelike, Timelike, Weekday};
use serde_json::{json, Map, Value};

use crate::config::DetectionConfig;
use crate::model::{round_to, CleanEvent, TimePattern, TimePatternKind};

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Detect weekday, hour-of-day and weekend concentrations (all UTC).
///
/// Needs `time_min_events` cleaned events with at least
/// `time_min_exceptions` of them flagged; otherwise nothing is reported.
pub fn detect_time_patterns(events: &[CleanEvent], cfg: &DetectionConfig) -> Vec<TimePattern> {
    let exceptions: Vec<&CleanEvent> = events.iter().filter(|e| e.is_concession).collect();
    if events.len() < cfg.time_min_events
        || exceptions.is_empty()
        || exceptions.len() < cfg.time_min_exceptions
    {
        return Vec::new();
    }

    let total = exceptions.len() as f64;
    let mut patterns = Vec::new();

    let mut by_day = [0usize; 7];
    let mut by_hour = [0usize; 24];
    for e in &exceptions {
        by_day[e.timestamp.weekday().num_days_from_monday() as usize] += 1;
        by_hour[e.timestamp.hour() as usize] += 1;
    }

    let (peak_day, day_count) = peak(&by_day);
    let day_share = day_count as f64 / total;
    if day_share > cfg.weekday_share_threshold {
        patterns.push(TimePattern {
            kind: TimePatternKind::WeekdayConcentration,
            description: format!(
                "{:.0}% of exceptions occur on {}",
                day_share * 100.0,
                DAY_NAMES[peak_day]
            ),
            confidence: round_to(day_share, 4),
            details: json!({
                "peak_day": peak_day,
                "peak_day_name": DAY_NAMES[peak_day],
                "concentration": round_to(day_share, 4),
                "distribution": distribution(&by_day, total, 7, |i| DAY_NAMES[i].to_string()),
            }),
        });
    }

    let (peak_hour, hour_count) = peak(&by_hour);
    let hour_share = hour_count as f64 / total;
    if hour_share > cfg.peak_hour_share_threshold {
        patterns.push(TimePattern {
            kind: TimePatternKind::PeakHour,
            description: format!(
                "Peak exception hour is {:02}:00 ({:.0}%)",
                peak_hour,
                hour_share * 100.0
            ),
            confidence: round_to(hour_share, 4),
            details: json!({
                "peak_hour": peak_hour,
                "concentration": round_to(hour_share, 4),
                "distribution": distribution(&by_hour, total, 5, |i| i.to_string()),
            }),
        });
    }

    let exception_weekend = weekend_share(exceptions.iter().copied());
    let overall_weekend = weekend_share(events.iter());
    let difference = exception_weekend - overall_weekend;
    if difference.abs() > cfg.weekend_difference_threshold {
        let direction = if difference > 0.0 { "higher" } else { "lower" };
        patterns.push(TimePattern {
            kind: TimePatternKind::WeekendDifference,
            description: format!("Weekend exception share is {direction} than the overall weekend share"),
            confidence: round_to(difference.abs(), 4),
            details: json!({
                "weekend_share": round_to(exception_weekend, 4),
                "overall_weekend_share": round_to(overall_weekend, 4),
                "difference": round_to(difference, 4),
            }),
        });
    }

    patterns
}

fn weekend_share<'a>(events: impl ExactSizeIterator<Item = &'a CleanEvent>) -> f64 {
    let n = events.len().max(1);
    let weekend = events
        .filter(|e| matches!(e.timestamp.weekday(), Weekday::Sat | Weekday::Sun))
        .count();
    weekend as f64 / n as f64
}

/// Share of exceptions for the `limit` busiest non-empty buckets.
fn distribution(
    buckets: &[usize],
    total: f64,
    limit: usize,
    label: impl Fn(usize) -> String,
) -> Value {
    let mut ranked: Vec<(usize, usize)> = buckets
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, c)| c > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let shares: Map<String, Value> = ranked
        .into_iter()
        .take(limit)
        .map(|(i, c)| (label(i), json!(round_to(c as f64 / total, 4))))
        .collect();
    Value::Object(shares)
}

/// Index and value of the largest bucket; ties go to the lowest index.
fn peak(buckets: &[usize]) -> (usize, usize) {
    buckets
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0), |best, (i, c)| if c > best.1 { (i, c) } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::event;

    fn cfg() -> DetectionConfig {
        DetectionConfig::default()
    }

    #[test]
    fn test_insufficient_data() {
        let events: Vec<_> = (0..9).map(|i| event("A", "X", i, true)).collect();
        assert!(detect_time_patterns(&events, &cfg()).is_empty());

        let mut events: Vec<_> = (0..20).map(|i| event("A", "X", i, false)).collect();
        for e in events.iter_mut().take(4) {
            e.is_concession = true;
        }
        assert!(detect_time_patterns(&events, &cfg()).is_empty());
    }

    #[test]
    fn test_monday_morning_concentration() {
        // 2024-01-01 is a Monday. 10 exceptions at 08:xx that day, then one
        // clean delivery per day at 14:00 for the next 13 days.
        let mut events: Vec<_> = (0..10).map(|i| event("A", "X", i, true)).collect();
        for day in 1..=13 {
            events.push(event("A", "X", day * 24 * 60 + 6 * 60, false));
        }

        let patterns = detect_time_patterns(&events, &cfg());
        let kinds: Vec<TimePatternKind> = patterns.iter().map(|p| p.kind).collect();
        assert!(kinds.contains(&TimePatternKind::WeekdayConcentration));
        assert!(kinds.contains(&TimePatternKind::PeakHour));

        let day = patterns
            .iter()
            .find(|p| p.kind == TimePatternKind::WeekdayConcentration)
            .unwrap();
        assert_eq!(day.details["peak_day_name"], "Monday");
        assert_eq!(day.confidence, 1.0);

        let hour = patterns
            .iter()
            .find(|p| p.kind == TimePatternKind::PeakHour)
            .unwrap();
        assert_eq!(hour.details["peak_hour"], 8);

        // Clean deliveries cover two weekends, exceptions none.
        let weekend = patterns
            .iter()
            .find(|p| p.kind == TimePatternKind::WeekendDifference)
            .unwrap();
        assert!(weekend.description.contains("lower"));
    }

    #[test]
    fn test_details_carry_distribution() {
        // 6 exceptions Monday 08:xx, 4 on Tuesday 09:xx, 2 clean deliveries.
        let mut events: Vec<_> = (0..6).map(|i| event("A", "X", i, true)).collect();
        events.extend((0..4).map(|i| event("A", "X", 24 * 60 + 60 + i, true)));
        events.extend((0..2).map(|i| event("A", "X", 24 * 60 + 120 + i, false)));

        let patterns = detect_time_patterns(&events, &cfg());
        let day = patterns
            .iter()
            .find(|p| p.kind == TimePatternKind::WeekdayConcentration)
            .unwrap();
        assert_eq!(day.details["distribution"], json!({ "Monday": 0.6, "Tuesday": 0.4 }));

        let hour = patterns
            .iter()
            .find(|p| p.kind == TimePatternKind::PeakHour)
            .unwrap();
        assert_eq!(hour.details["distribution"], json!({ "8": 0.6, "9": 0.4 }));
    }

    #[test]
    fn test_distribution_keeps_busiest_buckets() {
        let buckets = [1, 0, 3, 2, 2, 1, 1];
        let shares = distribution(&buckets, 10.0, 3, |i| i.to_string());
        assert_eq!(shares, json!({ "2": 0.3, "3": 0.2, "4": 0.2 }));
    }

    #[test]
    fn test_peak_tie_breaks_low() {
        assert_eq!(peak(&[2, 5, 5, 1]), (1, 5));
        assert_eq!(peak(&[0, 0, 0]), (0, 0));
    }
}
