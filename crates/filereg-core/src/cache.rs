//! Local mirror of the server's file list.
//!
//! The cache is only ever replaced wholesale with a list the server returned,
//! never patched per record. Search is a pure view over the cached list.

use crate::{FileId, FileRecord};

/// Ordered sequence of records from the last successful list fetch.
#[derive(Debug, Clone, Default)]
pub struct RegistryCache {
    records: Vec<FileRecord>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached records, in the order the server returned them.
    pub fn list(&self) -> &[FileRecord] {
        &self.records
    }

    /// Swap in a freshly fetched list. The previous content is dropped entirely.
    pub fn replace(&mut self, records: Vec<FileRecord>) {
        self.records = records;
    }

    /// Records matching `filter`, in cache order.
    pub fn filter(&self, filter: &SearchFilter) -> Vec<FileRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Case-insensitive substring search on `name` and `path`, ANDed.
///
/// An empty query matches everything. Queries are lowercased once on
/// construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    name: String,
    path: String,
}

impl SearchFilter {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            path: path.to_lowercase(),
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self::new(name, "")
    }

    pub fn by_path(path: &str) -> Self {
        Self::new("", path)
    }

    pub fn name_query(&self) -> &str {
        &self.name
    }

    pub fn path_query(&self) -> &str {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.path.is_empty()
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        record.name.to_lowercase().contains(&self.name)
            && record.path.to_lowercase().contains(&self.path)
    }
}
