use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::aggregator::DEFAULT_WINDOW_DAYS;
use super::percentiles::PerformanceReport;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Trailing window in days (default 7).
    pub days: Option<i64>,
}

impl ReportQuery {
    fn window_days(&self) -> Result<i64, AppError> {
        match self.days {
            None => Ok(DEFAULT_WINDOW_DAYS),
            Some(d) if (0..=3_650).contains(&d) => Ok(d),
            Some(d) => Err(AppError::BadRequest(format!(
                "days must be between 0 and 3650, got {d}"
            ))),
        }
    }
}

// ─── GET /api/performance/reports/:metric_id ─────────────────────
/// One report as JSON; 404 when the metric has no samples in the window.

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(metric_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PerformanceReport>, AppError> {
    let days = query.window_days()?;
    state
        .metrics
        .report(&metric_id, days)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no samples for metric '{metric_id}'")))
}

// ─── GET /api/performance/reports/:metric_id/stream ──────────────
/// Server-Sent Events endpoint.
/// Pushes the report (or `null` while there is no data) every 500 ms.

pub async fn report_stream(
    State(state): State<Arc<AppState>>,
    Path(metric_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let days = query.window_days()?;
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let report = state.metrics.report(&metric_id, days);
        let json = serde_json::to_string(&report).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_to_a_week() {
        assert_eq!(ReportQuery { days: None }.window_days().unwrap(), 7);
        assert_eq!(ReportQuery { days: Some(30) }.window_days().unwrap(), 30);
    }

    #[test]
    fn negative_window_is_rejected() {
        assert!(ReportQuery { days: Some(-1) }.window_days().is_err());
        assert!(ReportQuery { days: Some(100_000) }.window_days().is_err());
    }
}
