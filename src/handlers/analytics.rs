use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::analytics::AnalyticsEvent;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub url: Option<String>,
}

// ─── POST /api/analytics/events ──────────────────────────────────

pub async fn track_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrackEventRequest>,
) -> Result<(StatusCode, Json<AnalyticsEvent>), AppError> {
    let event_type = req.event_type.trim();
    if event_type.is_empty() {
        return Err(AppError::BadRequest("eventType must not be empty".into()));
    }
    let event = state.analytics.track_event(event_type, req.properties, req.url);
    Ok((StatusCode::ACCEPTED, Json(event)))
}

// ─── GET /api/analytics/events ───────────────────────────────────

pub async fn recent_events(State(state): State<Arc<AppState>>) -> Json<Vec<AnalyticsEvent>> {
    Json(state.analytics.recent_events())
}
