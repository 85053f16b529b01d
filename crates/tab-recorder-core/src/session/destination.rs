//! Artifact destination naming and resolution.

use serde::{Deserialize, Serialize};

/// Canonical media extension, without the dot.
pub const MEDIA_EXTENSION: &str = "webm";

/// Folder used when nothing else names one.
pub const DEFAULT_FOLDER: &str = "Recordings";

/// Filename used when nothing else names one.
pub const DEFAULT_FILENAME: &str = "tab-recording.webm";

const SEPARATOR: char = '/';

/// Directory and file name of the eventual artifact.
///
/// Always normalized: the folder carries no trailing separator and the
/// filename ends with the canonical media extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Target directory, relative to the download root.
    pub folder: String,
    /// Target file name.
    pub filename: String,
}

/// Possibly incomplete destination, as supplied by a command or the mirror.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationParts {
    /// Folder, if one was given.
    #[serde(default)]
    pub folder: Option<String>,
    /// Filename, if one was given.
    #[serde(default)]
    pub filename: Option<String>,
}

impl Default for Destination {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl Destination {
    /// Build a destination, filling gaps with the defaults.
    pub fn new(folder: Option<&str>, filename: Option<&str>) -> Self {
        Self::from_parts(&DestinationParts {
            folder: folder.map(str::to_string),
            filename: filename.map(str::to_string),
        })
    }

    /// Build a destination from parts, filling gaps with the defaults.
    pub fn from_parts(parts: &DestinationParts) -> Self {
        Self::resolve(parts, None, None)
    }

    /// Resolve field by field: explicit, then session-held, then persisted,
    /// then the default.
    pub fn resolve(
        explicit: &DestinationParts,
        session: Option<&Destination>,
        persisted: Option<&DestinationParts>,
    ) -> Self {
        let folder = non_empty(explicit.folder.as_deref())
            .or(session.map(|d| d.folder.as_str()))
            .or_else(|| persisted.and_then(|p| non_empty(p.folder.as_deref())))
            .map(normalize_folder)
            .unwrap_or_else(|| DEFAULT_FOLDER.to_string());

        let filename = non_empty(explicit.filename.as_deref())
            .or(session.map(|d| d.filename.as_str()))
            .or_else(|| persisted.and_then(|p| non_empty(p.filename.as_deref())))
            .map(normalize_filename)
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        Self { folder, filename }
    }

    /// Overwrite the fields present in `parts`, keeping the others.
    pub fn merge(&mut self, parts: &DestinationParts) {
        if let Some(folder) = non_empty(parts.folder.as_deref()) {
            self.folder = normalize_folder(folder);
        }
        if let Some(filename) = non_empty(parts.filename.as_deref()) {
            self.filename = normalize_filename(filename);
        }
    }

    /// Final relative path of the artifact: `folder/filename`.
    pub fn artifact_path(&self) -> String {
        format!(
            "{}{}{}",
            self.folder.trim_end_matches(SEPARATOR),
            SEPARATOR,
            self.filename.trim_start_matches(SEPARATOR)
        )
    }
}

impl From<&Destination> for DestinationParts {
    fn from(destination: &Destination) -> Self {
        Self {
            folder: Some(destination.folder.clone()),
            filename: Some(destination.filename.clone()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn normalize_folder(folder: &str) -> String {
    let trimmed = folder.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_filename(filename: &str) -> String {
    let suffix = format!(".{MEDIA_EXTENSION}");
    if filename.ends_with(&suffix) {
        filename.to_string()
    } else {
        format!("{filename}{suffix}")
    }
}
