use chrono::{DateTime, Utc};
use serde::Serialize;

/// Percentile breakdown for one metric over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub metric_id: String,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl PerformanceReport {
    /// Builds a report from raw durations. `None` when there are none.
    pub fn from_durations(
        metric_id: impl Into<String>,
        mut durations: Vec<f64>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        durations.sort_by(f64::total_cmp);

        Some(Self {
            metric_id: metric_id.into(),
            p50: nearest_rank(&durations, 50.0),
            p95: nearest_rank(&durations, 95.0),
            p99: nearest_rank(&durations, 99.0),
            min: durations[0],
            max: durations[durations.len() - 1],
            count: durations.len(),
            period_start,
            period_end,
        })
    }
}

/// Nearest-rank percentile over an ascending slice:
/// `index = ceil(p / 100 * n) - 1`, clamped to `[0, n - 1]`. No interpolation.
pub fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let rank = (percentile / 100.0 * n as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    sorted[index]
}
