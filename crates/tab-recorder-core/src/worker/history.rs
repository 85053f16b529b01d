//! Most recent saved recordings.

use crate::{CoreResult, store::PersistentStore};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::debug;

/// Store key holding the history list.
pub const HISTORY_KEY: &str = "recordingHistory";

/// Entries kept; older ones are discarded.
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// One saved recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Relative path the artifact was saved to.
    pub path: String,
    /// When the download was issued.
    pub date: DateTime<Utc>,
}

/// Newest-first list of saved recordings in the persistent store.
#[derive(Clone)]
pub struct RecordingHistory {
    store: Arc<dyn PersistentStore>,
}

impl RecordingHistory {
    /// History kept in `store`.
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// All entries, newest first. A malformed list reads as empty.
    pub async fn entries(&self) -> CoreResult<Vec<HistoryEntry>> {
        let mut stored = self.store.get(&[HISTORY_KEY]).await?;
        let Some(value) = stored.remove(HISTORY_KEY) else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(error = %e, "Discarding malformed recording history");
            Vec::new()
        }))
    }

    /// Prepend `path` and trim to [`MAX_HISTORY_ENTRIES`].
    pub async fn record(&self, path: &str, date: DateTime<Utc>) -> CoreResult<()> {
        let mut entries = self.entries().await?;
        entries.insert(
            0,
            HistoryEntry {
                path: path.to_string(),
                date,
            },
        );
        entries.truncate(MAX_HISTORY_ENTRIES);
        self.write(&entries).await
    }

    /// Remove every entry.
    pub async fn clear(&self) -> CoreResult<()> {
        self.write(&[]).await
    }

    async fn write(&self, entries: &[HistoryEntry]) -> CoreResult<()> {
        let mut update = Map::new();
        update.insert(HISTORY_KEY.to_string(), serde_json::to_value(entries)?);
        self.store.set(update).await
    }
}
