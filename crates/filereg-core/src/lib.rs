use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod config_file;
pub mod coordinator;
pub mod error;
pub mod selection;
pub mod store;

// Re-export for convenience
pub use cache::{RegistryCache, SearchFilter};
pub use coordinator::{
    ActionCoordinator, DeleteOutcome, DetailView, Notice, RegistryView, RowAction, RowHandlers,
    UploadView, UserPrompt,
};
pub use error::{ActionError, StoreError};
pub use selection::SelectionCursor;
pub use store::{FileStore, HttpFileStore};

/// Base URL used when nothing else is configured (the registry server's dev default).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Server-assigned identifier of a file record. Stable for the record's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(FileId)
    }
}

/// Metadata for one file known to the registry.
///
/// `extension`, `size` and the timestamps are derived by the server; the client
/// only ever changes `name`, `path` and `comment`, and only through an update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub size: u64,
    pub path: String,
    /// Opaque server timestamp, displayed as-is.
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FileRecord {
    /// The comment, with an absent comment treated as empty.
    pub fn comment_or_empty(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }

    /// Name with the extension appended (the server stores them separately).
    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }
}

/// The editable fields of a record, sent as the body of `PUT /files/{id}/update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdits {
    pub name: String,
    pub path: String,
    pub comment: String,
}

impl FileEdits {
    /// Initial values of the detail view's inputs for `record`.
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            name: record.name.clone(),
            path: record.path.clone(),
            comment: record.comment_or_empty().to_string(),
        }
    }
}

/// Result of a server-side reconciliation (`POST /actualize`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualizeReport {
    pub added: u64,
    pub removed: u64,
}

impl ActualizeReport {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

impl fmt::Display for ActualizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Added: {}, Removed: {}", self.added, self.removed)
    }
}

/// Multipart payload for `POST /files/upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    /// File name of the binary part (the local file's name).
    pub source_name: String,
    pub contents: Vec<u8>,
    /// Name to register the file under, with or without extension.
    pub name: String,
    /// Logical storage path inside the registry.
    pub path: String,
    pub comment: String,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            source_name: String::new(),
            contents: Vec::new(),
            name: String::new(),
            path: "/".to_string(),
            comment: String::new(),
        }
    }
}

impl UploadForm {
    /// Read a local file into a form. The registry name defaults to the file name.
    pub async fn read_from(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            name: source_name.clone(),
            source_name,
            contents,
            ..Self::default()
        })
    }
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Registry server root, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Apply the values present in a config file over the defaults.
    pub fn from_file(file: &config_file::ConfigFile) -> Self {
        let defaults = Self::default();
        let server = file.server.as_ref();
        Self {
            base_url: server
                .and_then(|s| s.base_url.clone())
                .unwrap_or(defaults.base_url),
            timeout_secs: server
                .and_then(|s| s.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
