//! Pattern and trend detection over a batch of delivery-exception events.

pub mod cleaner;
pub mod pattern;
pub mod time;
pub mod trend;

use std::collections::HashMap;

use crate::model::CleanEvent;

pub use cleaner::clean;
pub use pattern::detect_patterns;
pub use time::detect_time_patterns;
pub use trend::detect_trends;

/// Events sharing one grouping key, in batch order.
pub(crate) struct Group<'a> {
    pub key: &'a str,
    pub events: Vec<&'a CleanEvent>,
}

impl Group<'_> {
    pub fn exception_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_concession).count()
    }

    /// Exception events over group size; 0 for an empty group.
    pub fn rate(&self) -> f64 {
        exception_rate(&self.events)
    }
}

/// Partition `events` by `key`. Groups come out in first-appearance order.
pub(crate) fn group_by<'a, F>(events: &'a [CleanEvent], key: F) -> Vec<Group<'a>>
where
    F: Fn(&'a CleanEvent) -> &'a str,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for event in events {
        let k = key(event);
        let slot = *index.entry(k).or_insert_with(|| {
            groups.push(Group {
                key: k,
                events: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].events.push(event);
    }

    groups
}

/// Share of exception events; the denominator is at least 1.
pub(crate) fn exception_rate(events: &[&CleanEvent]) -> f64 {
    let exceptions = events.iter().filter(|e| e.is_concession).count();
    exceptions as f64 / events.len().max(1) as f64
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::model::CleanEvent;

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    pub fn event(driver: &str, depot: &str, minutes: i64, exception: bool) -> CleanEvent {
        CleanEvent {
            id: format!("{driver}-{depot}-{minutes}"),
            driver_id: driver.to_string(),
            depot_id: depot.to_string(),
            timestamp: base_time() + Duration::minutes(minutes),
            is_concession: exception,
            kind: exception.then(|| "neighbor".to_string()),
        }
    }

    /// `n` events for one driver, one minute apart, the first `exceptions` flagged.
    pub fn batch(driver: &str, depot: &str, n: usize, exceptions: usize) -> Vec<CleanEvent> {
        (0..n)
            .map(|i| event(driver, depot, i as i64, i < exceptions))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::event;
    use super::*;

    #[test]
    fn test_group_by_preserves_first_appearance() {
        let events = vec![
            event("B", "D1", 0, false),
            event("A", "D1", 1, true),
            event("B", "D2", 2, true),
            event("C", "D1", 3, false),
        ];

        let groups = group_by(&events, |e| e.driver_id.as_str());
        let keys: Vec<&str> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
        assert_eq!(groups[0].events.len(), 2);
        assert_eq!(groups[0].exception_count(), 1);
        assert_eq!(groups[0].rate(), 0.5);
    }

    #[test]
    fn test_empty_rate_is_zero() {
        assert_eq!(exception_rate(&[]), 0.0);
    }
}
