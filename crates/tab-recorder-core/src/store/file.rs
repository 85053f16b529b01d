//! JSON document store on the local filesystem.

use crate::{CoreError, CoreResult, store::PersistentStore};

use std::{
    panic::Location,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde_json::{Map, Value};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, instrument};

/// Store that keeps all entries in a single JSON object on disk.
///
/// Every mutation rewrites the whole document using a temp file and rename,
/// so a crash mid-write leaves the previous document intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use `path` as the backing document. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CoreResult<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Store {
                reason: format!(
                    "Expected a JSON object in {:?}, found {}",
                    self.path,
                    type_name(&other)
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    async fn persist(&self, entries: &Map<String, Value>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let contents = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");

        let mut temp_file = fs::File::create(&temp_path).await?;
        temp_file.write_all(&contents).await?;
        temp_file.sync_all().await?;
        drop(temp_file);

        fs::rename(&temp_path, &self.path).await?;

        debug!(path = ?self.path, keys = entries.len(), "Store persisted");

        Ok(())
    }
}

#[async_trait]
impl PersistentStore for JsonFileStore {
    #[instrument(skip(self))]
    async fn get(&self, keys: &[&str]) -> CoreResult<Map<String, Value>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.remove(*key).map(|v| (key.to_string(), v)))
            .collect())
    }

    #[instrument(skip(self, new_entries))]
    async fn set(&self, new_entries: Map<String, Value>) -> CoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.extend(new_entries);
        self.persist(&entries).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, keys: &[&str]) -> CoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.persist(&entries).await
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
