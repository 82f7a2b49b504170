//! Feature-flag resolution and client performance/analytics aggregation for
//! the P4 marketplace frontends, served over a small HTTP API.

pub mod analytics;
pub mod config;
pub mod error;
pub mod flags;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod redis_client;
pub mod server;
pub mod telemetry;

use std::sync::Arc;

use analytics::AnalyticsTracker;
use flags::FlagResolver;
use metrics::MetricAggregator;
use telemetry::TelemetrySink;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Layered flag resolution; handlers read and update through it.
    pub flags: Arc<FlagResolver>,

    /// Sample buffer; handlers and the timing middleware push, reports read.
    pub metrics: MetricAggregator,

    pub analytics: AnalyticsTracker,
}

impl AppState {
    pub fn new(flags: Arc<FlagResolver>, sink: Option<Arc<dyn TelemetrySink>>) -> Self {
        let (metrics, analytics) = match sink {
            Some(sink) => (
                MetricAggregator::new().with_sink(sink.clone()),
                AnalyticsTracker::new().with_sink(sink),
            ),
            None => (MetricAggregator::new(), AnalyticsTracker::new()),
        };
        Self {
            flags,
            metrics,
            analytics,
        }
    }
}
