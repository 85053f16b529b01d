use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where session state is kept.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON state file. Defaults to `session.json` in the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}
