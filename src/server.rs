use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Feature flags ───────────────────────────────────────
        .route(
            "/api/feature-flags",
            get(handlers::flags::list_flags).patch(handlers::flags::update_flags_bulk),
        )
        .route(
            "/api/feature-flags/resolve",
            post(handlers::flags::resolve_flags),
        )
        .route("/api/feature-flags/reset", post(handlers::flags::reset_flags))
        .route("/api/feature-flags/stream", get(handlers::flags::flags_stream))
        .route(
            "/api/feature-flags/:key",
            get(handlers::flags::get_flag).put(handlers::flags::update_flag),
        )
        // ── Performance metrics ─────────────────────────────────
        .route(
            "/api/performance/metrics",
            get(handlers::performance::list_samples)
                .post(handlers::performance::record_sample)
                .delete(handlers::performance::clear_samples),
        )
        .route(
            "/api/performance/search/validate",
            get(handlers::performance::validate_search),
        )
        .route("/api/performance/reports/:metric_id", get(stream::get_report))
        .route(
            "/api/performance/reports/:metric_id/stream",
            get(stream::report_stream),
        )
        // ── Analytics ───────────────────────────────────────────
        .route(
            "/api/analytics/events",
            get(handlers::analytics::recent_events).post(handlers::analytics::track_event),
        )
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}
