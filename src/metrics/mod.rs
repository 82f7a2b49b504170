pub mod aggregator;
pub mod measured;
pub mod percentiles;
pub mod stream;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

pub use aggregator::MetricAggregator;
pub use measured::MeasuredStream;
pub use percentiles::PerformanceReport;

/// A single timing observation.
/// Created once per measured operation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    /// e.g. "search", "page-load"
    pub metric_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: f64,
    /// Where it was measured, e.g. "catalog", "GET /api/feature-flags"
    pub context: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl MetricSample {
    /// Sample stamped with the current time.
    pub fn new(metric_id: impl Into<String>, context: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            metric_id: metric_id.into(),
            timestamp: Utc::now(),
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            context: context.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}
