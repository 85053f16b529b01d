use crate::{CoreResult, store::PersistentStore};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// In-memory store. Clones share the same contents, which lets a test drop a
/// coordinator and build a new one over the same data.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<Map<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry.
    pub async fn snapshot(&self) -> Map<String, Value> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> CoreResult<Map<String, Value>> {
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, new_entries: Map<String, Value>) -> CoreResult<()> {
        self.entries.lock().await.extend(new_entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> CoreResult<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}
