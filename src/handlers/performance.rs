use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::aggregator::{MetricAggregator, DEFAULT_WINDOW_DAYS, SEARCH_METRIC};
use crate::metrics::MetricSample;
use crate::AppState;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSampleRequest {
    pub metric_id: String,
    pub duration_ms: f64,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Defaults to the time of receipt.
    pub timestamp: Option<DateTime<Utc>>,
}

impl RecordSampleRequest {
    fn into_sample(self) -> Result<MetricSample, AppError> {
        if self.metric_id.trim().is_empty() {
            return Err(AppError::BadRequest("metricId must not be empty".into()));
        }
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(AppError::BadRequest(
                "durationMs must be a non-negative number".into(),
            ));
        }
        Ok(MetricSample {
            metric_id: self.metric_id,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            duration_ms: self.duration_ms,
            context: self.context,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchValidation {
    pub acceptable: bool,
    pub p95: Option<f64>,
    pub count: usize,
}

// ─── GET /api/performance/metrics ────────────────────────────────

pub async fn list_samples(State(state): State<Arc<AppState>>) -> Json<Vec<MetricSample>> {
    Json(state.metrics.all_samples())
}

// ─── POST /api/performance/metrics ───────────────────────────────

pub async fn record_sample(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordSampleRequest>,
) -> Result<StatusCode, AppError> {
    let sample = req.into_sample()?;
    state.metrics.record(sample);
    Ok(StatusCode::ACCEPTED)
}

// ─── DELETE /api/performance/metrics ─────────────────────────────

pub async fn clear_samples(State(state): State<Arc<AppState>>) -> StatusCode {
    state.metrics.clear();
    tracing::info!("performance metrics cleared");
    StatusCode::NO_CONTENT
}

// ─── GET /api/performance/search/validate ────────────────────────

pub async fn validate_search(State(state): State<Arc<AppState>>) -> Json<SearchValidation> {
    let report = state.metrics.report(SEARCH_METRIC, DEFAULT_WINDOW_DAYS);
    Json(SearchValidation {
        acceptable: MetricAggregator::search_within_budget(report.as_ref()),
        p95: report.as_ref().map(|r| r.p95),
        count: report.map(|r| r.count).unwrap_or(0),
    })
}
