//! Subset of the session mirrored to the persistent store.

use crate::{
    CoreResult,
    session::{Destination, DestinationParts, ElapsedTimer, WorkerId},
    store::PersistentStore,
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

const KEY_WORKER_ID: &str = "boundWorkerId";
const KEY_ACTIVE: &str = "sessionActiveFlag";
const KEY_FOLDER: &str = "destinationFolder";
const KEY_FILENAME: &str = "destinationFilename";
const KEY_TIMER_ANCHOR: &str = "timerAnchorMs";
const KEY_ACCUMULATED: &str = "accumulatedMs";

// Every key the mirror may write.
const MIRROR_KEYS: [&str; 6] = [
    KEY_WORKER_ID,
    KEY_ACTIVE,
    KEY_FOLDER,
    KEY_FILENAME,
    KEY_TIMER_ANCHOR,
    KEY_ACCUMULATED,
];

/// Persisted copy of the session, used to recover after a coordinator restart.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionMirror {
    /// Worker bound to the persisted session.
    pub worker_id: Option<WorkerId>,
    /// Set while a session is in progress.
    pub active: bool,
    /// Persisted destination, possibly partial.
    pub destination: DestinationParts,
    /// Persisted timer, present only when timer persistence is enabled.
    pub timer: Option<ElapsedTimer>,
}

impl SessionMirror {
    /// Mirror of a freshly started session.
    pub fn for_session(worker_id: WorkerId, destination: &Destination) -> Self {
        Self {
            worker_id: Some(worker_id),
            active: true,
            destination: DestinationParts::from(destination),
            timer: None,
        }
    }

    /// Read the mirror. Malformed values read as absent.
    pub async fn load(store: &dyn PersistentStore) -> CoreResult<Self> {
        let entries = store.get(&MIRROR_KEYS).await?;

        let accumulated_ms: Option<u64> = field(&entries, KEY_ACCUMULATED);
        let timer = accumulated_ms.map(|accumulated_ms| ElapsedTimer {
            anchor_ms: field::<Option<u64>>(&entries, KEY_TIMER_ANCHOR).flatten(),
            accumulated_ms,
        });

        Ok(Self {
            worker_id: field(&entries, KEY_WORKER_ID),
            active: field(&entries, KEY_ACTIVE).unwrap_or(false),
            destination: DestinationParts {
                folder: field(&entries, KEY_FOLDER),
                filename: field(&entries, KEY_FILENAME),
            },
            timer,
        })
    }

    /// Write every present field.
    pub async fn save(&self, store: &dyn PersistentStore) -> CoreResult<()> {
        let mut entries = Map::new();
        entries.insert(KEY_ACTIVE.to_string(), json!(self.active));
        if let Some(worker_id) = self.worker_id {
            entries.insert(KEY_WORKER_ID.to_string(), json!(worker_id));
        }
        if let Some(folder) = &self.destination.folder {
            entries.insert(KEY_FOLDER.to_string(), json!(folder));
        }
        if let Some(filename) = &self.destination.filename {
            entries.insert(KEY_FILENAME.to_string(), json!(filename));
        }
        if let Some(timer) = &self.timer {
            entries.extend(timer_entries(timer));
        }
        store.set(entries).await
    }

    /// Overwrite only the timer fields.
    pub async fn save_timer(store: &dyn PersistentStore, timer: &ElapsedTimer) -> CoreResult<()> {
        store.set(timer_entries(timer)).await
    }

    /// Delete every mirror key.
    pub async fn clear(store: &dyn PersistentStore) -> CoreResult<()> {
        store.remove(&MIRROR_KEYS).await
    }

    /// True when the mirror describes a session worth restoring.
    pub fn is_restorable(&self) -> bool {
        self.active && self.worker_id.is_some()
    }
}

fn timer_entries(timer: &ElapsedTimer) -> Map<String, Value> {
    let mut entries = Map::new();
    entries.insert(KEY_TIMER_ANCHOR.to_string(), json!(timer.anchor_ms));
    entries.insert(KEY_ACCUMULATED.to_string(), json!(timer.accumulated_ms));
    entries
}

fn field<T: DeserializeOwned>(entries: &Map<String, Value>, key: &str) -> Option<T> {
    let value = entries.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(key, error = %e, "Ignoring malformed mirror value");
            None
        }
    }
}
