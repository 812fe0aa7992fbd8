use tracing::debug;

use crate::config::DetectionConfig;
use crate::detect;
use crate::model::{AnalysisResult, Filters, RawEvent, TimePattern};

/// Single entry point of the engine: clean, then detect.
///
/// Holds only immutable thresholds, so one instance can be shared across
/// concurrent requests without locking.
#[derive(Debug, Clone, Default)]
pub struct AnalysisService {
    config: DetectionConfig,
}

impl AnalysisService {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run pattern and trend detection over one complete batch.
    ///
    /// An empty cleaned set is a normal outcome and yields an empty result.
    pub fn analyze(&self, events: &[RawEvent], filters: &Filters) -> AnalysisResult {
        let cleaned = detect::clean(events, filters);
        if cleaned.is_empty() {
            debug!(submitted = events.len(), "no events left after cleaning");
            return AnalysisResult::default();
        }

        let result = AnalysisResult {
            patterns: detect::detect_patterns(&cleaned, &self.config),
            trends: detect::detect_trends(&cleaned, &self.config),
        };
        debug!(
            cleaned = cleaned.len(),
            patterns = result.patterns.len(),
            trends = result.trends.len(),
            "analysis complete"
        );
        result
    }

    pub fn time_patterns(&self, events: &[RawEvent], filters: &Filters) -> Vec<TimePattern> {
        let cleaned = detect::clean(events, filters);
        detect::detect_time_patterns(&cleaned, &self.config)
    }
}
