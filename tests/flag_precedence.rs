#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use storefront_core::error::{AppError, Result};
use storefront_core::flags::{
    default_flags, FeatureFlagSet, FlagKey, FlagResolver, FlagSource, FlagState, MemoryFlagStore,
};

struct Remote(Option<Value>);

#[async_trait]
impl FlagSource for Remote {
    async fn fetch(&self) -> Result<Value> {
        self.0
            .clone()
            .ok_or_else(|| AppError::Internal("flags endpoint unreachable".into()))
    }
}

fn all_off(keys: &[&str]) -> FeatureFlagSet {
    keys.iter()
        .map(|k| (k.to_string(), FlagState::new(false)))
        .collect()
}

#[tokio::test]
async fn url_beats_snapshot_beats_remote_beats_defaults() {
    let store = Arc::new(MemoryFlagStore::with_slot(
        "snapshot",
        r#"{"a":false,"b":true}"#,
    ));
    let resolver = FlagResolver::builder(store)
        .storage_key("snapshot")
        .defaults(all_off(&["a", "b", "c", "d"]))
        .remote(Arc::new(Remote(Some(json!({"a":false,"b":false,"c":true})))))
        .url_override("a:true")
        .build()
        .await;

    let resolved = resolver.resolve().await;

    assert!(resolved["a"].enabled);
    assert!(resolved["b"].enabled);
    assert!(resolved["c"].enabled);
    assert!(!resolved["d"].enabled);
    assert_eq!(resolver.resolve().await, resolved);
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_defaults() {
    let resolver = FlagResolver::builder(Arc::new(MemoryFlagStore::new()))
        .remote(Arc::new(Remote(None)))
        .build()
        .await;

    assert_eq!(resolver.resolve().await, default_flags());
    for key in FlagKey::ALL {
        let _ = resolver.is_enabled(key);
    }
}

#[tokio::test]
async fn remote_full_objects_replace_metadata() {
    let remote = json!({
        "orders.checkout": {
            "enabled": true,
            "rolloutPercentage": 10,
            "description": "Checkout pilot",
            "tags": ["orders", "pilot"]
        }
    });
    let resolver = FlagResolver::builder(Arc::new(MemoryFlagStore::new()))
        .remote(Arc::new(Remote(Some(remote))))
        .build()
        .await;
    resolver.resolve().await;

    let flag = resolver.get_flag(FlagKey::OrdersCheckout).unwrap();
    assert!(flag.enabled);
    assert_eq!(flag.rollout_percentage, Some(10));
    assert_eq!(flag.description, "Checkout pilot");
    assert!(flag.tags.contains("pilot"));
}
