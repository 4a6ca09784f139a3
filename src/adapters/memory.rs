//! Process-local durable store.
//!
//! Survives nothing beyond the process; useful for embedding without a
//! writable directory and for tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DurableStore;
use crate::domain::Snapshot;

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a snapshot under `key`
    pub fn with_snapshot(key: impl Into<String>, snapshot: Snapshot) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), snapshot);
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
