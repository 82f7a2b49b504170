use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;

use crate::error::Result;

/// A string-keyed slot store. The resolver keeps its whole snapshot under
/// one key.
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

// ─── Redis ───────────────────────────────────────────────────────

pub struct RedisFlagStore {
    conn: ConnectionManager,
}

impl RedisFlagStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl FlagStore for RedisFlagStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }
}

// ─── In-memory ───────────────────────────────────────────────────

/// Process-local store, used when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryFlagStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a slot, e.g. with a snapshot from a previous run.
    pub fn with_slot(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.slots.lock().insert(key.to_string(), value.to_string());
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.slots.lock().get(key).cloned()
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_a_slot() {
        let store = MemoryFlagStore::new();
        assert_eq!(store.load("ff").await.unwrap(), None);

        store.save("ff", r#"{"a":true}"#).await.unwrap();
        assert_eq!(store.load("ff").await.unwrap().as_deref(), Some(r#"{"a":true}"#));

        store.save("ff", "{}").await.unwrap();
        assert_eq!(store.get("ff").as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn seeded_slot_is_visible() {
        let store = MemoryFlagStore::with_slot("snapshot", "[]");
        assert_eq!(store.load("snapshot").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(store.load("other").await.unwrap(), None);
    }
}
