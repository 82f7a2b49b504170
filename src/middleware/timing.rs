use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::MetricSample;
use crate::AppState;

/// Metric id used for every timed API request.
pub const HTTP_METRIC: &str = "http";

/// Times every request and:
///
///   X-Response-Time-Us : total handler wall time in microseconds
///   Server-Timing      : same value in the standard Server-Timing format
///
/// API requests are also recorded as `http` samples (context
/// `"{METHOD} {route}"`). Long-lived SSE streams are skipped.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    let status = response.status().as_u16();
    if route.starts_with("/api/") && !route.ends_with("/stream") {
        let context = format!("{method} {route}");
        let mut sample = MetricSample::new(HTTP_METRIC, context, elapsed);
        if status >= 500 {
            sample = sample.with_tag("error");
        }
        state.metrics.record(sample);

        tracing::debug!(%method, route = %route, status, us = us as u64, "request served");
    }

    response
}
