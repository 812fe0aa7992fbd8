//! Property checks over seeded random batches.

use concession_radar::analysis::AnalysisService;
use concession_radar::config::DetectionConfig;
use concession_radar::model::{Filters, PatternKind, RawEvent, Severity, TrendDirection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

const DEPOTS: [&str; 3] = ["BER1", "HAM2", "MUC3"];

fn random_batch(seed: u64, n: usize) -> Vec<RawEvent> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let driver = format!("DRV-{}", rng.gen_range(0..12));
            let depot = DEPOTS[rng.gen_range(0..DEPOTS.len())];
            // Some records are broken on purpose.
            let broken = rng.gen_bool(0.05);
            RawEvent {
                id: Some(format!("evt-{i}")),
                driver_id: if broken { None } else { Some(driver) },
                depot_id: Some(depot.to_string()),
                timestamp: Some(format!(
                    "2024-02-{:02}T{:02}:{:02}:00Z",
                    rng.gen_range(1..29),
                    rng.gen_range(0..24),
                    rng.gen_range(0..60)
                )),
                is_concession: json!(rng.gen_bool(0.12)),
                kind: None,
            }
        })
        .collect()
}

#[test]
fn severity_consistent_with_rate() {
    let cfg = DetectionConfig::default();
    let svc = AnalysisService::new(cfg.clone());
    for seed in 0..20 {
        let result = svc.analyze(&random_batch(seed, 400), &Filters::default());
        for p in &result.patterns {
            let banded = match p.kind {
                PatternKind::DriverHotspot => Severity::from_rate(p.rate),
                PatternKind::DepotSpike => Severity::from_rate(p.rate + cfg.depot_severity_offset),
            };
            assert_eq!(p.severity, banded, "seed {seed}: {}", p.id);
            assert!(p.confidence <= 1.0);
            assert!(!p.drivers.is_empty());
            match p.kind {
                PatternKind::DriverHotspot => assert!(p.confidence >= cfg.driver_confidence_floor),
                PatternKind::DepotSpike => assert!(p.confidence >= cfg.depot_confidence_floor),
            }
        }
    }
}

#[test]
fn analyze_is_idempotent() {
    let svc = AnalysisService::default();
    let batch = random_batch(7, 300);
    let filters = Filters {
        depot_id: Some("BER1".into()),
        driver_id: None,
    };
    assert_eq!(svc.analyze(&batch, &filters), svc.analyze(&batch, &filters));
}

#[test]
fn depot_filter_never_leaks_other_depots() {
    let svc = AnalysisService::default();
    for seed in 0..10 {
        for depot in DEPOTS {
            let filters = Filters {
                depot_id: Some(depot.into()),
                driver_id: None,
            };
            let result = svc.analyze(&random_batch(seed, 300), &filters);
            assert!(result
                .patterns
                .iter()
                .all(|p| p.depot_id.as_deref() == Some(depot)));
        }
    }
}

#[test]
fn driver_filter_scopes_hotspots() {
    let svc = AnalysisService::default();
    for seed in 0..10 {
        let filters = Filters {
            depot_id: None,
            driver_id: Some("DRV-3".into()),
        };
        let result = svc.analyze(&random_batch(seed, 300), &filters);
        for p in result.patterns.iter().filter(|p| p.kind == PatternKind::DriverHotspot) {
            assert_eq!(p.drivers, vec!["DRV-3".to_string()]);
        }
        assert!(result.trends.iter().all(|t| t.driver_id == "DRV-3"));
    }
}

#[test]
fn stable_trends_have_small_change() {
    let svc = AnalysisService::default();
    for seed in 0..20 {
        let result = svc.analyze(&random_batch(seed, 200), &Filters::default());
        for t in &result.trends {
            assert!(t.significance >= 0.0);
            match t.direction {
                // Rounded percentage points, so compare against 2pp inclusive.
                TrendDirection::Stable => assert!(t.change.abs() <= 2.0),
                TrendDirection::Increasing => assert!(t.change > 0.0),
                TrendDirection::Decreasing => assert!(t.change < 0.0),
            }
        }
    }
}

#[test]
fn all_invalid_input_yields_empty_result() {
    let svc = AnalysisService::default();
    let batch: Vec<RawEvent> = random_batch(3, 50)
        .into_iter()
        .map(|mut e| {
            e.timestamp = Some("not a date".into());
            e
        })
        .collect();
    assert!(svc.analyze(&batch, &Filters::default()).is_empty());
}
