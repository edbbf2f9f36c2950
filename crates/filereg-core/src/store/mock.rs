//! In-memory registry server for testing.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::{FileStore, StoreFuture};
use crate::error::StoreError;
use crate::{ActualizeReport, FileEdits, FileId, FileRecord, UploadForm};

/// Endpoint selector for scripting failures and latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Update,
    Delete,
    Actualize,
    Upload,
    Download,
    Ping,
}

/// One recorded call, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Get(FileId),
    Update(FileId, FileEdits),
    Delete(FileId),
    Actualize,
    Upload { name: String, path: String },
    Download(FileId),
    Ping,
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::List => Op::List,
            Call::Get(_) => Op::Get,
            Call::Update(..) => Op::Update,
            Call::Delete(_) => Op::Delete,
            Call::Actualize => Op::Actualize,
            Call::Upload { .. } => Op::Upload,
            Call::Download(_) => Op::Download,
            Call::Ping => Op::Ping,
        }
    }
}

/// A scripted failure for [`MockStore`].
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Non-2xx response, optionally with a server message.
    Status { status: u16, message: Option<String> },
    /// Transport-level failure (connection refused, timeout, ...).
    Transport(String),
}

impl MockFailure {
    fn into_error(self) -> StoreError {
        match self {
            MockFailure::Status { status, message } => StoreError::Status { status, message },
            MockFailure::Transport(msg) => StoreError::Other(msg),
        }
    }
}

/// Storage changes the next `actualize` call will discover.
#[derive(Debug, Default)]
struct StagedScan {
    found: Vec<FileRecord>,
    missing: Vec<FileId>,
}

/// A hand-rolled server double implementing [`FileStore`].
///
/// Supports:
/// - Server-side state that mutations actually change, so re-fetches observe them.
/// - Per-endpoint scripted failures, consumed one per call.
/// - Per-endpoint latency queues for ordering tests.
/// - Call recording via [`calls()`](MockStore::calls).
///
/// A list response is snapshotted when the call is made; latency only delays
/// its delivery.
pub struct MockStore {
    records: Mutex<Vec<FileRecord>>,
    contents: Mutex<HashMap<FileId, Vec<u8>>>,
    next_id: Mutex<i64>,
    failures: Mutex<HashMap<Op, VecDeque<MockFailure>>>,
    delays: Mutex<HashMap<Op, VecDeque<Duration>>>,
    staged_scan: Mutex<StagedScan>,
    calls: Mutex<Vec<Call>>,
}

impl MockStore {
    /// Create a server holding `records`.
    pub fn new(records: Vec<FileRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id.0).max().unwrap_or(0) + 1;
        Self {
            records: Mutex::new(records),
            contents: Mutex::new(HashMap::new()),
            next_id: Mutex::new(next_id),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            staged_scan: Mutex::new(StagedScan::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call to `op` fail with `failure`. Calls queue up.
    pub fn fail_next(&self, op: Op, failure: MockFailure) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(failure);
    }

    /// Delay the response of the next call to `op`. Calls queue up.
    pub fn delay_next(&self, op: Op, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(delay);
    }

    /// Files that the next `actualize` finds on disk (`found`) or finds gone (`missing`).
    pub fn stage_scan(&self, found: Vec<FileRecord>, missing: Vec<FileId>) {
        let mut scan = self.staged_scan.lock().unwrap();
        scan.found.extend(found);
        scan.missing.extend(missing);
    }

    /// Change a record behind the client's back (another client's edit).
    pub fn modify_record(&self, id: FileId, f: impl FnOnce(&mut FileRecord)) {
        if let Some(record) = self.records.lock().unwrap().iter_mut().find(|r| r.id == id) {
            f(record);
        }
    }

    /// Current server-side records.
    pub fn records(&self) -> Vec<FileRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// How many calls hit `op`.
    pub fn call_count(&self, op: Op) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.op() == op)
            .count()
    }

    /// Record the call and pop its scripted failure and delay.
    fn begin(&self, call: Call) -> (Result<(), StoreError>, Option<Duration>) {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(|q| q.pop_front());
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(|q| q.pop_front());
        (failure.map_or(Ok(()), |f| Err(f.into_error())), delay)
    }

    fn not_found(id: FileId) -> StoreError {
        StoreError::Status {
            status: 404,
            message: Some(format!("File {id} not found")),
        }
    }

    fn bad_request(message: &str) -> StoreError {
        StoreError::Status {
            status: 400,
            message: Some(message.to_string()),
        }
    }

    fn get_now(&self, id: FileId) -> Result<FileRecord, StoreError> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    fn update_now(&self, id: FileId, edits: &FileEdits) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        record.name = edits.name.clone();
        record.path = edits.path.clone();
        record.comment = Some(edits.comment.clone());
        record.updated_at = Some("updated".to_string());
        Ok(())
    }

    fn delete_now(&self, id: FileId) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        self.contents.lock().unwrap().remove(&id);
        Ok(())
    }

    fn actualize_now(&self) -> ActualizeReport {
        let scan = std::mem::take(&mut *self.staged_scan.lock().unwrap());
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !scan.missing.contains(&r.id));
        let removed = (before - records.len()) as u64;
        let added = scan.found.len() as u64;
        records.extend(scan.found);
        ActualizeReport { added, removed }
    }

    fn upload_now(&self, form: &UploadForm) -> Result<FileRecord, StoreError> {
        if form.name.trim().is_empty() || form.contents.is_empty() {
            return Err(Self::bad_request("Name and file are required"));
        }
        let (name, extension) = match form.name.rfind('.') {
            Some(idx) if idx > 0 => (
                form.name[..idx].to_string(),
                form.name[idx..].to_string(),
            ),
            _ => (form.name.clone(), String::new()),
        };

        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.name == name && r.extension == extension && r.path == form.path)
        {
            return Err(Self::bad_request("File already exists"));
        }
        let id = {
            let mut next = self.next_id.lock().unwrap();
            let id = FileId(*next);
            *next += 1;
            id
        };
        let record = FileRecord {
            id,
            name,
            extension,
            size: form.contents.len() as u64,
            path: form.path.clone(),
            created_at: "created".to_string(),
            updated_at: None,
            comment: (!form.comment.is_empty()).then(|| form.comment.clone()),
        };
        records.push(record.clone());
        self.contents
            .lock()
            .unwrap()
            .insert(id, form.contents.clone());
        Ok(record)
    }
}

async fn settle<T>(
    outcome: Result<T, StoreError>,
    delay: Option<Duration>,
) -> Result<T, StoreError> {
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
    outcome
}

impl FileStore for MockStore {
    fn list_files(&self) -> StoreFuture<'_, Vec<FileRecord>> {
        let (gate, delay) = self.begin(Call::List);
        let outcome = gate.map(|()| self.records());
        Box::pin(settle(outcome, delay))
    }

    fn get_file(&self, id: FileId) -> StoreFuture<'_, FileRecord> {
        let (gate, delay) = self.begin(Call::Get(id));
        let outcome = gate.and_then(|()| self.get_now(id));
        Box::pin(settle(outcome, delay))
    }

    fn update_file<'a>(&'a self, id: FileId, edits: &'a FileEdits) -> StoreFuture<'a, ()> {
        let (gate, delay) = self.begin(Call::Update(id, edits.clone()));
        let outcome = gate.and_then(|()| self.update_now(id, edits));
        Box::pin(settle(outcome, delay))
    }

    fn delete_file(&self, id: FileId) -> StoreFuture<'_, ()> {
        let (gate, delay) = self.begin(Call::Delete(id));
        let outcome = gate.and_then(|()| self.delete_now(id));
        Box::pin(settle(outcome, delay))
    }

    fn actualize(&self) -> StoreFuture<'_, ActualizeReport> {
        let (gate, delay) = self.begin(Call::Actualize);
        let outcome = gate.map(|()| self.actualize_now());
        Box::pin(settle(outcome, delay))
    }

    fn upload_file<'a>(&'a self, form: &'a UploadForm) -> StoreFuture<'a, FileRecord> {
        let (gate, delay) = self.begin(Call::Upload {
            name: form.name.clone(),
            path: form.path.clone(),
        });
        let outcome = gate.and_then(|()| self.upload_now(form));
        Box::pin(settle(outcome, delay))
    }

    fn download_file<'a>(&'a self, id: FileId, dest: &'a Path) -> StoreFuture<'a, u64> {
        let (gate, delay) = self.begin(Call::Download(id));
        let outcome = gate.and_then(|()| {
            self.get_now(id)?;
            let data = self
                .contents
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .unwrap_or_default();
            Ok(data)
        });
        Box::pin(async move {
            let data = settle(outcome, delay).await?;
            tokio::fs::write(dest, &data).await?;
            Ok(data.len() as u64)
        })
    }

    fn download_url(&self, id: FileId) -> String {
        format!("mock://files/{id}/download")
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        let (gate, delay) = self.begin(Call::Ping);
        Box::pin(settle(gate, delay))
    }
}
