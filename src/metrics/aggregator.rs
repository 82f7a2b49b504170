use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;

use super::measured::MeasuredStream;
use super::percentiles::PerformanceReport;
use super::MetricSample;
use crate::telemetry::{spawn_best_effort, TelemetrySink};

// ─── Configuration ───────────────────────────────────────────────

/// Trailing window used when a caller does not pick one.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Metric id checked by [`MetricAggregator::validate_search_performance`].
pub const SEARCH_METRIC: &str = "search";

/// p95 budget for search, in milliseconds.
const SEARCH_P95_BUDGET_MS: f64 = 500.0;

// ─── MetricAggregator ────────────────────────────────────────────

/// Thread-safe sample buffer with percentile reports.
///
/// Cheap to clone; every clone appends to the same buffer. Samples are kept
/// in completion order and only dropped by [`clear`](Self::clear).
#[derive(Clone, Default)]
pub struct MetricAggregator {
    samples: Arc<Mutex<Vec<MetricSample>>>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl MetricAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every recorded sample to `sink`, best effort.
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Append a sample, then forward it to the sink without waiting.
    pub fn record(&self, sample: MetricSample) {
        tracing::debug!(
            metric_id = %sample.metric_id,
            context = %sample.context,
            duration_ms = sample.duration_ms,
            "recording performance metric"
        );

        if let Some(sink) = self.sink.clone() {
            let forwarded = sample.clone();
            spawn_best_effort("performance metric", async move {
                sink.send_metric(&forwarded).await
            });
        }

        self.samples.lock().push(sample);
    }

    /// Run `op` and record how long it took.
    ///
    /// Only a normal return is recorded; if `op` panics nothing is appended.
    pub fn measure<T, F>(&self, metric_id: &str, context: &str, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = op();
        self.record(MetricSample::new(metric_id, context, start.elapsed()));
        result
    }

    /// Await `fut` and record how long it took.
    /// Dropping the returned future early records nothing.
    pub async fn measure_async<T, Fut>(&self, metric_id: &str, context: &str, fut: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = fut.await;
        self.record(MetricSample::new(metric_id, context, start.elapsed()));
        result
    }

    /// Pass `stream` through unchanged, recording one sample per item.
    pub fn measure_stream<S, T, E>(&self, metric_id: &str, context: &str, stream: S) -> MeasuredStream<S>
    where
        S: Stream<Item = Result<T, E>>,
    {
        MeasuredStream::new(self.clone(), metric_id, context, stream)
    }

    /// Report over the last `window_days` days, `None` if nothing matches.
    /// Windows too large for `chrono` saturate instead of panicking.
    pub fn report(&self, metric_id: &str, window_days: i64) -> Option<PerformanceReport> {
        let window = chrono::Duration::try_days(window_days).unwrap_or(if window_days < 0 {
            chrono::Duration::MIN
        } else {
            chrono::Duration::MAX
        });
        self.report_at(metric_id, window, Utc::now())
    }

    /// Report over `[now - window, now]`; a sample exactly at the cutoff counts.
    pub fn report_at(
        &self,
        metric_id: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Option<PerformanceReport> {
        let cutoff = now.checked_sub_signed(window).unwrap_or(if window > chrono::Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });

        let durations: Vec<f64> = self
            .samples
            .lock()
            .iter()
            .filter(|s| s.metric_id == metric_id && s.timestamp >= cutoff)
            .map(|s| s.duration_ms)
            .collect();

        PerformanceReport::from_durations(metric_id, durations, cutoff, now)
    }

    /// True when search p95 stays under 500 ms. No data counts as a failure.
    pub fn validate_search_performance(&self) -> bool {
        Self::search_within_budget(self.report(SEARCH_METRIC, DEFAULT_WINDOW_DAYS).as_ref())
    }

    /// Budget check over an already computed search report.
    pub fn search_within_budget(report: Option<&PerformanceReport>) -> bool {
        let Some(report) = report else {
            tracing::warn!("no search performance data available");
            return false;
        };

        let acceptable = report.p95 < SEARCH_P95_BUDGET_MS;
        tracing::info!(p95_ms = report.p95, acceptable, "search performance check");
        acceptable
    }

    pub fn all_samples(&self) -> Vec<MetricSample> {
        self.samples.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Wipe all samples.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}
