#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use serde_json::{json, Value};
use std::sync::Arc;

use storefront_core::flags::{FlagResolver, MemoryFlagStore};
use storefront_core::{server, AppState};

/// Serves the router on an ephemeral port and returns its base URL.
async fn spawn_app() -> (String, Arc<AppState>) {
    let flags = FlagResolver::builder(Arc::new(MemoryFlagStore::new()))
        .build()
        .await;
    flags.resolve().await;
    let state = Arc::new(AppState::new(Arc::new(flags), None));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn flag_endpoints_read_update_and_reset() {
    let (base, state) = spawn_app().await;
    let client = reqwest::Client::new();

    let view: Value = client
        .get(format!("{base}/api/feature-flags/orders.checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["enabled"], false);
    assert_eq!(view["flag"]["tags"], json!(["checkout", "orders"]));

    let updated: Value = client
        .put(format!("{base}/api/feature-flags/orders.checkout"))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["orders.checkout"]["enabled"], true);
    assert!(state.flags.is_enabled("orders.checkout"));

    let unknown: Value = client
        .get(format!("{base}/api/feature-flags/not.a.flag"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unknown["enabled"], false);
    assert!(unknown["flag"].is_null());

    let reset = client
        .post(format!("{base}/api/feature-flags/reset"))
        .send()
        .await
        .unwrap();
    assert!(reset.status().is_success());
    assert!(!state.flags.is_enabled("orders.checkout"));
}

#[tokio::test]
async fn resolve_applies_the_query_override() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let resolved: Value = client
        .post(format!("{base}/api/feature-flags/resolve?ff=wallet.basic:on,bogus"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["wallet.basic"]["enabled"], true);
    assert_eq!(resolved["catalog.publicBrowse"]["enabled"], true);
}

#[tokio::test]
async fn empty_bulk_update_is_rejected() {
    let (base, _state) = spawn_app().await;
    let resp = reqwest::Client::new()
        .patch(format!("{base}/api/feature-flags"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn recorded_samples_show_up_in_reports() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    for d in [10, 20, 30, 40, 50] {
        let resp = client
            .post(format!("{base}/api/performance/metrics"))
            .json(&json!({ "metricId": "search", "durationMs": d, "context": "catalog" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 202);
    }

    let report: Value = client
        .get(format!("{base}/api/performance/reports/search"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["count"], 5);
    assert_eq!(report["p50"], 30.0);
    assert_eq!(report["p95"], 50.0);

    let missing = client
        .get(format!("{base}/api/performance/reports/nonexistent-metric"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let validation: Value = client
        .get(format!("{base}/api/performance/search/validate"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(validation["acceptable"], true);
}

#[tokio::test]
async fn api_requests_are_timed() {
    let (base, state) = spawn_app().await;
    let resp = reqwest::Client::new()
        .get(format!("{base}/api/feature-flags"))
        .send()
        .await
        .unwrap();

    assert!(resp.headers().contains_key("x-response-time-us"));
    assert!(resp.headers().contains_key("server-timing"));

    let http_samples: Vec<_> = state
        .metrics
        .all_samples()
        .into_iter()
        .filter(|s| s.metric_id == "http")
        .collect();
    assert_eq!(http_samples.len(), 1);
    assert_eq!(http_samples[0].context, "GET /api/feature-flags");
}

#[tokio::test]
async fn analytics_events_are_accepted_and_listed() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/analytics/events"))
        .json(&json!({ "eventType": "click", "properties": { "elementId": "rfq-submit" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 202);

    let events: Value = client
        .get(format!("{base}/api/analytics/events"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["eventType"], "click");
    assert_eq!(events[0]["properties"]["elementId"], "rfq-submit");
}

#[tokio::test]
async fn flag_stream_opens_with_the_current_set() {
    let (base, state) = spawn_app().await;
    state.flags.update("invoice.vat", true).await;

    let mut resp = reqwest::Client::new()
        .get(format!("{base}/api/feature-flags/stream"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let mut buf = String::new();
    let first_event = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !buf.contains("\n\n") {
            let chunk = resp.chunk().await.unwrap().expect("stream ended early");
            buf.push_str(&String::from_utf8_lossy(&chunk));
        }
        buf.split("\n\n").next().unwrap().to_string()
    })
    .await
    .unwrap();

    assert!(first_event.lines().any(|l| l == "event: flags"));
    let data = first_event
        .lines()
        .find_map(|l| l.strip_prefix("data:"))
        .unwrap()
        .trim();
    let set: Value = serde_json::from_str(data).unwrap();
    assert_eq!(set, serde_json::to_value(state.flags.all_flags()).unwrap());
    assert_eq!(set["invoice.vat"]["enabled"], true);
}
