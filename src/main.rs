use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use storefront_core::config::Config;
use storefront_core::flags::{FlagResolver, FlagStore, HttpFlagSource, MemoryFlagStore, RedisFlagStore};
use storefront_core::telemetry::{HttpTelemetrySink, TelemetrySink};
use storefront_core::{redis_client, server, AppState};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── 1. Configuration ─────────────────────────────────────────
    let config = Config::from_env().expect("invalid configuration");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .expect("failed to build HTTP client");

    // ── 2. Flag snapshot store ───────────────────────────────────
    let store: Arc<dyn FlagStore> = match &config.redis_url {
        Some(url) => match redis_client::connect(url).await {
            Ok(conn) => Arc::new(RedisFlagStore::new(conn)),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, keeping flag snapshots in memory");
                Arc::new(MemoryFlagStore::new())
            }
        },
        None => Arc::new(MemoryFlagStore::new()),
    };

    // ── 3. Resolve flags ─────────────────────────────────────────
    let mut builder = FlagResolver::builder(store).storage_key(&config.flag_storage_key);
    if let Some(url) = &config.flags_url {
        builder = builder.remote(Arc::new(HttpFlagSource::new(http.clone(), url)));
    }
    if let Some(raw) = &config.flag_override {
        builder = builder.url_override(raw);
    }
    let flags = Arc::new(builder.build().await);
    let resolved = flags.resolve().await;
    let enabled = resolved.values().filter(|f| f.enabled).count();
    tracing::info!(flags = resolved.len(), enabled, "feature flags resolved");

    // ── 4. Shared state ──────────────────────────────────────────
    let sink = config
        .telemetry_url
        .as_ref()
        .map(|url| Arc::new(HttpTelemetrySink::new(http.clone(), url)) as Arc<dyn TelemetrySink>);
    let state = Arc::new(AppState::new(flags, sink));

    // ── 5. Bind & serve ──────────────────────────────────────────
    let app = server::create_router(state);
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!(%addr, "storefront-core listening");

    axum::serve(listener, app)
        .await
        .expect("server exited with error");
}
