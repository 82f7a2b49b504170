use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::{FeatureFlagSet, FlagState};

/// One precedence layer: only the keys that layer has an opinion on.
pub type FlagLayer = BTreeMap<String, FlagOverride>;

/// A per-key override. Fields left as `None` keep the lower layer's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagOverride {
    pub enabled: bool,
    pub rollout_percentage: Option<u8>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

impl FlagOverride {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled,
            rollout_percentage: None,
            description: None,
            tags: None,
        }
    }

    /// Overlay this override on top of `base` (or on an empty state).
    pub fn apply_to(&self, base: Option<FlagState>) -> FlagState {
        let mut state = base.unwrap_or_else(|| FlagState::new(self.enabled));
        state.enabled = self.enabled;
        if let Some(pct) = self.rollout_percentage {
            state.rollout_percentage = Some(pct);
        }
        if let Some(description) = &self.description {
            state.description = description.clone();
        }
        if let Some(tags) = &self.tags {
            state.tags = tags.clone();
        }
        state
    }
}

impl From<&FlagState> for FlagOverride {
    fn from(state: &FlagState) -> Self {
        Self {
            enabled: state.enabled,
            rollout_percentage: state.rollout_percentage,
            description: Some(state.description.clone()),
            tags: Some(state.tags.clone()),
        }
    }
}

// ─── Merge ───────────────────────────────────────────────────────

/// Merges `layers` (highest precedence first) over `defaults`.
///
/// Higher layers win per key; keys only present in lower layers survive.
pub fn merge_layers(defaults: &FeatureFlagSet, layers: &[&FlagLayer]) -> FeatureFlagSet {
    let mut merged = defaults.clone();
    for layer in layers.iter().rev() {
        for (key, over) in layer.iter() {
            let base = merged.remove(key);
            merged.insert(key.clone(), over.apply_to(base));
        }
    }
    merged
}

/// Turns a full set back into a layer, e.g. to cache what was just persisted.
pub fn layer_from_set(set: &FeatureFlagSet) -> FlagLayer {
    set.iter()
        .map(|(key, state)| (key.clone(), FlagOverride::from(state)))
        .collect()
}

// ─── URL override ────────────────────────────────────────────────

/// Parses `key1:on,key2:false,...`.
///
/// `on` / `true` (any case) enable, every other value disables. The value
/// stops at the next `:`, so `key:on:x` enables `key`. Pairs with no
/// `:` or an empty key are dropped without affecting the others.
pub fn parse_override_param(raw: &str) -> FlagLayer {
    raw.split(',')
        .filter_map(|pair| {
            let Some((key, value)) = pair.split_once(':') else {
                if !pair.trim().is_empty() {
                    tracing::debug!(pair, "ignoring malformed flag override");
                }
                return None;
            };
            let key = key.trim();
            if key.is_empty() {
                tracing::debug!(pair, "ignoring flag override with empty key");
                return None;
            }
            // Anything after a second `:` is ignored.
            let value = value.split(':').next().unwrap_or_default().trim();
            let enabled = value.eq_ignore_ascii_case("on") || value.eq_ignore_ascii_case("true");
            Some((key.to_string(), FlagOverride::enabled(enabled)))
        })
        .collect()
}

// ─── JSON layers (persisted snapshot, remote response) ──────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry {
    enabled: bool,
    #[serde(default)]
    rollout_percentage: Option<u8>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<BTreeSet<String>>,
}

/// Accepts either a bare bool or a `FlagState`-shaped object.
fn override_from_value(value: &Value) -> Option<FlagOverride> {
    match value {
        Value::Bool(enabled) => Some(FlagOverride::enabled(*enabled)),
        Value::Object(_) => {
            let entry = JsonEntry::deserialize(value).ok()?;
            if entry.rollout_percentage.is_some_and(|p| p > 100) {
                return None;
            }
            Some(FlagOverride {
                enabled: entry.enabled,
                rollout_percentage: entry.rollout_percentage,
                description: entry.description,
                tags: entry.tags,
            })
        }
        _ => None,
    }
}

/// Lenient conversion of a JSON object into a layer.
/// Malformed entries are skipped individually; a non-object yields an empty layer.
pub fn layer_from_value(value: &Value, source: &str) -> FlagLayer {
    let Value::Object(entries) = value else {
        tracing::warn!(source, "flag payload is not a JSON object, ignoring it");
        return FlagLayer::new();
    };

    entries
        .iter()
        .filter_map(|(key, raw)| match override_from_value(raw) {
            Some(over) => Some((key.clone(), over)),
            None => {
                tracing::warn!(source, key = %key, "discarding malformed flag entry");
                None
            }
        })
        .collect()
}

/// Same as [`layer_from_value`] but starting from raw text.
pub fn layer_from_json(raw: &str, source: &str) -> FlagLayer {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => layer_from_value(&value, source),
        Err(e) => {
            tracing::warn!(source, error = %e, "unparseable flag payload, ignoring it");
            FlagLayer::new()
        }
    }
}
