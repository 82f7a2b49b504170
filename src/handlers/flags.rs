use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

use crate::error::AppError;
use crate::flags::{FeatureFlagSet, FlagState, URL_OVERRIDE_PARAM};
use crate::AppState;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FlagView {
    pub key: String,
    pub enabled: bool,
    /// `None` for keys neither resolved nor in the default table.
    pub flag: Option<FlagState>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFlagRequest {
    pub enabled: bool,
}

// ─── GET /api/feature-flags ──────────────────────────────────────

pub async fn list_flags(State(state): State<Arc<AppState>>) -> Json<FeatureFlagSet> {
    Json(state.flags.all_flags())
}

// ─── GET /api/feature-flags/:key ─────────────────────────────────
/// Never 404s: unknown keys are reported as disabled.

pub async fn get_flag(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<FlagView> {
    Json(FlagView {
        enabled: state.flags.is_enabled(&key),
        flag: state.flags.get_flag(&key),
        key,
    })
}

// ─── PUT /api/feature-flags/:key ─────────────────────────────────

pub async fn update_flag(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<UpdateFlagRequest>,
) -> Json<FeatureFlagSet> {
    tracing::info!(key = %key, enabled = req.enabled, "feature flag updated");
    Json(state.flags.update(key, req.enabled).await)
}

// ─── PATCH /api/feature-flags ────────────────────────────────────

pub async fn update_flags_bulk(
    State(state): State<Arc<AppState>>,
    Json(changes): Json<BTreeMap<String, bool>>,
) -> Result<Json<FeatureFlagSet>, AppError> {
    if changes.is_empty() {
        return Err(AppError::BadRequest("no flags to update".into()));
    }
    tracing::info!(count = changes.len(), "feature flags updated in bulk");
    Ok(Json(state.flags.update_bulk(changes).await))
}

// ─── POST /api/feature-flags/reset ───────────────────────────────

pub async fn reset_flags(State(state): State<Arc<AppState>>) -> Json<FeatureFlagSet> {
    tracing::info!("feature flags reset to defaults");
    Json(state.flags.reset_to_defaults().await)
}

// ─── POST /api/feature-flags/resolve?ff=key:on,... ───────────────
/// Re-runs the layered resolution with this request's URL override.

pub async fn resolve_flags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<FeatureFlagSet> {
    state
        .flags
        .set_url_override(params.get(URL_OVERRIDE_PARAM).map(String::as_str));
    Json(state.flags.resolve().await)
}

// ─── GET /api/feature-flags/stream ───────────────────────────────
/// Server-Sent Events: the current set on connect, then every change.

pub async fn flags_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let stream = state.flags.subscribe_stream().map(|set| {
        let json = serde_json::to_string(&set).unwrap_or_default();
        Ok(Event::default().event("flags").data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
