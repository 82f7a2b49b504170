use async_trait::async_trait;
use std::future::Future;

use crate::analytics::AnalyticsEvent;
use crate::error::Result;
use crate::metrics::MetricSample;

/// Remote collector for performance samples and analytics events.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn send_metric(&self, sample: &MetricSample) -> Result<()>;
    async fn send_event(&self, event: &AnalyticsEvent) -> Result<()>;
}

/// Posts JSON to `{base}/performance/metrics` and `{base}/analytics/events`.
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTelemetrySink {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn metrics_url(&self) -> String {
        format!("{}/performance/metrics", self.base_url)
    }

    pub fn events_url(&self) -> String {
        format!("{}/analytics/events", self.base_url)
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn send_metric(&self, sample: &MetricSample) -> Result<()> {
        self.client
            .post(self.metrics_url())
            .json(sample)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_event(&self, event: &AnalyticsEvent) -> Result<()> {
        self.client
            .post(self.events_url())
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Fire-and-forget: runs `fut` on the current runtime and only logs failures.
/// Outside a runtime the work is skipped.
pub(crate) fn spawn_best_effort<F>(what: &'static str, fut: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!(what, "no async runtime, skipping telemetry forward");
        return;
    };
    handle.spawn(async move {
        match fut.await {
            Ok(()) => tracing::debug!(what, "telemetry forwarded"),
            Err(e) => tracing::warn!(what, error = %e, "telemetry forward failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_urls_tolerate_trailing_slash() {
        let sink = HttpTelemetrySink::new(reqwest::Client::new(), "http://sink.local/api/");
        assert_eq!(sink.metrics_url(), "http://sink.local/api/performance/metrics");
        assert_eq!(sink.events_url(), "http://sink.local/api/analytics/events");
    }

    #[test]
    fn best_effort_outside_runtime_is_a_no_op() {
        spawn_best_effort("test", async { Ok(()) });
    }
}
