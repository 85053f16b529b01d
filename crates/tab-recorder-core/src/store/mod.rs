//! Persistent key-value storage used for restart recovery and history.

mod file;
mod memory;
mod mirror;

pub use {file::JsonFileStore, memory::MemoryStore, mirror::SessionMirror};

use crate::CoreResult;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Asynchronous key-value store.
///
/// Values are JSON. Implementations carry no business logic.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Read the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> CoreResult<Map<String, Value>>;

    /// Write every entry, replacing existing values.
    async fn set(&self, entries: Map<String, Value>) -> CoreResult<()>;

    /// Delete the given keys. Missing keys are ignored.
    async fn remove(&self, keys: &[&str]) -> CoreResult<()>;
}
