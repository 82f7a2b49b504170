use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{watch, Mutex as WriteLock};
use tokio_stream::wrappers::WatchStream;

use super::defaults::default_flags;
use super::layers::{
    layer_from_json, layer_from_set, layer_from_value, merge_layers, parse_override_param,
    FlagLayer, FlagOverride,
};
use super::remote::FlagSource;
use super::store::FlagStore;
use super::{FeatureFlagSet, FlagState};

const DEFAULT_STORAGE_KEY: &str = "p4-feature-flags";

// ─── Builder ─────────────────────────────────────────────────────

pub struct FlagResolverBuilder {
    store: Arc<dyn FlagStore>,
    remote: Option<Arc<dyn FlagSource>>,
    defaults: FeatureFlagSet,
    storage_key: String,
    url_override: Option<String>,
}

impl FlagResolverBuilder {
    pub fn remote(mut self, remote: Arc<dyn FlagSource>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn defaults(mut self, defaults: FeatureFlagSet) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn url_override(mut self, raw: impl Into<String>) -> Self {
        self.url_override = Some(raw.into());
        self
    }

    /// Reads the persisted snapshot (once) and publishes the initial set:
    /// URL override > snapshot > defaults. The remote layer joins on the
    /// first [`FlagResolver::resolve`].
    pub async fn build(self) -> FlagResolver {
        let persisted = match self.store.load(&self.storage_key).await {
            Ok(Some(raw)) => layer_from_json(&raw, "snapshot"),
            Ok(None) => FlagLayer::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read flag snapshot, starting from defaults");
                FlagLayer::new()
            }
        };
        let url_override = self
            .url_override
            .as_deref()
            .map(parse_override_param)
            .unwrap_or_default();

        let initial = merge_layers(&self.defaults, &[&url_override, &persisted]);
        let (current, _) = watch::channel(initial);

        tracing::info!(
            snapshot_keys = persisted.len(),
            override_keys = url_override.len(),
            remote = self.remote.is_some(),
            "feature flags initialised"
        );

        FlagResolver {
            defaults: self.defaults,
            store: self.store,
            remote: self.remote,
            storage_key: self.storage_key,
            layers: Mutex::new(Layers {
                url_override,
                persisted,
            }),
            current,
            writer: WriteLock::new(()),
        }
    }
}

// ─── Resolver ────────────────────────────────────────────────────

struct Layers {
    url_override: FlagLayer,
    /// Mirror of what was last written to the store.
    persisted: FlagLayer,
}

/// Answers "is flag X enabled?" for the whole process.
///
/// The current set lives in a `watch` channel, so subscribers always see the
/// latest set and never a backlog. Writers are serialized by `writer`, so
/// each change is computed from, persisted after and published over the
/// previous write.
pub struct FlagResolver {
    defaults: FeatureFlagSet,
    store: Arc<dyn FlagStore>,
    remote: Option<Arc<dyn FlagSource>>,
    storage_key: String,
    layers: Mutex<Layers>,
    current: watch::Sender<FeatureFlagSet>,
    writer: WriteLock<()>,
}

impl FlagResolver {
    pub fn builder(store: Arc<dyn FlagStore>) -> FlagResolverBuilder {
        FlagResolverBuilder {
            store,
            remote: None,
            defaults: default_flags(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            url_override: None,
        }
    }

    /// Merges URL override > snapshot > remote > defaults, publishes and
    /// persists the result.
    pub async fn resolve(&self) -> FeatureFlagSet {
        let remote = self.fetch_remote().await;

        let _write = self.writer.lock().await;
        let resolved = {
            let layers = self.layers.lock();
            merge_layers(
                &self.defaults,
                &[&layers.url_override, &layers.persisted, &remote],
            )
        };

        self.publish(resolved.clone()).await;
        resolved
    }

    /// Current value, falling back to the default table, then `false`.
    pub fn is_enabled<K: AsRef<str>>(&self, key: K) -> bool {
        let key = key.as_ref();
        if let Some(state) = self.current.borrow().get(key) {
            return state.enabled;
        }
        self.defaults.get(key).map(|s| s.enabled).unwrap_or(false)
    }

    /// Route-guard decision. A guard without a required flag lets everything through.
    pub fn guard(&self, required: Option<&str>) -> bool {
        match required {
            Some(key) => self.is_enabled(key),
            None => {
                tracing::warn!("flag guard used without a required flag, allowing");
                true
            }
        }
    }

    pub fn get_flag<K: AsRef<str>>(&self, key: K) -> Option<FlagState> {
        let key = key.as_ref();
        self.current
            .borrow()
            .get(key)
            .cloned()
            .or_else(|| self.defaults.get(key).cloned())
    }

    pub fn all_flags(&self) -> FeatureFlagSet {
        self.current.borrow().clone()
    }

    pub fn defaults(&self) -> &FeatureFlagSet {
        &self.defaults
    }

    pub async fn update(&self, key: impl Into<String>, enabled: bool) -> FeatureFlagSet {
        self.update_bulk([(key.into(), enabled)]).await
    }

    /// Overwrites the given keys in the current set; keys not yet known are added.
    pub async fn update_bulk<I, K>(&self, changes: I) -> FeatureFlagSet
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        let _write = self.writer.lock().await;
        let mut next = self.all_flags();
        for (key, enabled) in changes {
            let key = key.into();
            let base = next.remove(&key);
            next.insert(key, FlagOverride::enabled(enabled).apply_to(base));
        }

        self.publish(next.clone()).await;
        next
    }

    pub async fn reset_to_defaults(&self) -> FeatureFlagSet {
        let _write = self.writer.lock().await;
        let defaults = self.defaults.clone();
        self.publish(defaults.clone()).await;
        defaults
    }

    /// Replaces the URL override layer. Takes effect on the next `resolve`.
    pub fn set_url_override(&self, raw: Option<&str>) {
        let layer = raw.map(parse_override_param).unwrap_or_default();
        self.layers.lock().url_override = layer;
    }

    /// Latest-value subscription; `borrow()` on the receiver is the current set.
    pub fn subscribe(&self) -> watch::Receiver<FeatureFlagSet> {
        self.current.subscribe()
    }

    /// Stream form of [`subscribe`](Self::subscribe): yields the current set
    /// first, then every later one.
    pub fn subscribe_stream(&self) -> WatchStream<FeatureFlagSet> {
        WatchStream::new(self.current.subscribe())
    }

    // ── Internals ───────────────────────────────────────────────

    async fn fetch_remote(&self) -> FlagLayer {
        let Some(remote) = &self.remote else {
            return FlagLayer::new();
        };
        match remote.fetch().await {
            Ok(body) => layer_from_value(&body, "remote"),
            Err(e) => {
                tracing::warn!(error = %e, "remote flag fetch failed, continuing without it");
                FlagLayer::new()
            }
        }
    }

    /// Callers hold the `writer` lock.
    async fn publish(&self, set: FeatureFlagSet) {
        self.layers.lock().persisted = layer_from_set(&set);
        self.persist(&set).await;
        self.current.send_replace(set);
    }

    async fn persist(&self, set: &FeatureFlagSet) {
        let raw = match serde_json::to_string(set) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize flag snapshot");
                return;
            }
        };
        if let Err(e) = self.store.save(&self.storage_key, &raw).await {
            tracing::warn!(error = %e, "could not persist flag snapshot");
        }
    }
}
