//! Orchestration of user actions against the registry.
//!
//! Every operation follows the same shape: one remote call, then synchronous
//! updates of the cache / cursor / view state once the response is in. State
//! is kept behind a mutex that is never held across an `.await`, so operations
//! may overlap (an actualize can start while a save is in flight). There is no
//! ordering between overlapping refreshes: the last list response to arrive
//! replaces the cache, and the cache always holds one complete server snapshot.
//!
//! After any mutation the whole list is re-fetched rather than patched locally.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::cache::{RegistryCache, SearchFilter};
use crate::error::{ActionError, StoreError};
use crate::selection::SelectionCursor;
use crate::store::FileStore;
use crate::{ActualizeReport, FileEdits, FileId, FileRecord, UploadForm};

/// A click on a rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    OpenDetails(FileId),
    Delete(FileId),
}

/// The capabilities handed to the renderer for wiring row clicks.
///
/// Clicks are queued as [`RowAction`]s on a channel; the front end's event loop
/// drains it and calls [`ActionCoordinator::dispatch`]. The renderer never sees
/// the coordinator itself.
#[derive(Debug, Clone)]
pub struct RowHandlers {
    tx: mpsc::UnboundedSender<RowAction>,
}

impl RowHandlers {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RowAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn open_file_details(&self, id: FileId) {
        self.send(RowAction::OpenDetails(id));
    }

    pub fn delete_file(&self, id: FileId) {
        self.send(RowAction::Delete(id));
    }

    fn send(&self, action: RowAction) {
        if self.tx.send(action).is_err() {
            tracing::debug!(?action, "row action dropped: event loop has stopped");
        }
    }
}

/// Renders the displayed subset of the cache.
pub trait RegistryView: Send + Sync {
    /// Draw `rows` (already filtered) and wire their clicks to `handlers`.
    fn render(&self, rows: &[FileRecord], handlers: &RowHandlers);
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Error(m) => m,
        }
    }
}

/// Blocking user interaction: notifications and yes/no questions.
pub trait UserPrompt: Send + Sync {
    fn notify(&self, notice: &Notice);

    /// Ask a yes/no question. Resolves once the user has answered.
    fn confirm<'a>(&'a self, question: &'a str) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// State of the single-file detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DetailView {
    #[default]
    Closed,
    /// Showing `record` as fetched when the view was opened.
    Open { record: FileRecord },
}

impl DetailView {
    pub fn is_open(&self) -> bool {
        matches!(self, DetailView::Open { .. })
    }

    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            DetailView::Open { record } => Some(record),
            DetailView::Closed => None,
        }
    }
}

/// State of the upload form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadView {
    #[default]
    Closed,
    /// Open with the inputs as last entered or submitted.
    Open(UploadForm),
}

impl UploadView {
    pub fn is_open(&self) -> bool {
        matches!(self, UploadView::Open(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
}

#[derive(Debug, Default)]
struct RegistryState {
    cache: RegistryCache,
    cursor: SelectionCursor,
    filter: SearchFilter,
    detail: DetailView,
    upload: UploadView,
}

impl RegistryState {
    /// Closing the detail view also drops the selection.
    fn close_detail(&mut self) {
        self.detail = DetailView::Closed;
        self.cursor.clear();
    }
}

/// Runs user actions against a [`FileStore`] and keeps the cache, selection
/// cursor and views consistent with the server.
pub struct ActionCoordinator<S> {
    store: S,
    view: Arc<dyn RegistryView>,
    prompt: Arc<dyn UserPrompt>,
    handlers: RowHandlers,
    state: Mutex<RegistryState>,
}

impl<S: FileStore> ActionCoordinator<S> {
    pub fn new(
        store: S,
        view: Arc<dyn RegistryView>,
        prompt: Arc<dyn UserPrompt>,
        handlers: RowHandlers,
    ) -> Self {
        Self {
            store,
            view,
            prompt,
            handlers,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handlers(&self) -> &RowHandlers {
        &self.handlers
    }

    /// The full cached list.
    pub fn records(&self) -> Vec<FileRecord> {
        self.lock().cache.list().to_vec()
    }

    /// The cached list under the current search filter.
    pub fn displayed(&self) -> Vec<FileRecord> {
        let state = self.lock();
        state.cache.filter(&state.filter)
    }

    pub fn search_filter(&self) -> SearchFilter {
        self.lock().filter.clone()
    }

    pub fn selection(&self) -> Option<FileId> {
        self.lock().cursor.current()
    }

    pub fn detail(&self) -> DetailView {
        self.lock().detail.clone()
    }

    pub fn upload_view(&self) -> UploadView {
        self.lock().upload.clone()
    }

    /// Initial fetch of the file list.
    pub async fn load(&self) -> Result<usize, ActionError> {
        self.refresh()
            .await
            .map_err(|e| self.report(ActionError::ListFetchFailed(e)))
    }

    /// Change the search filter and re-render. No remote call.
    pub fn apply_search(&self, filter: SearchFilter) -> Vec<FileRecord> {
        let rows = {
            let mut state = self.lock();
            state.filter = filter;
            state.cache.filter(&state.filter)
        };
        self.view.render(&rows, &self.handlers);
        rows
    }

    /// Fetch one record, open it in the detail view and select it.
    pub async fn open_details(&self, id: FileId) -> Result<FileRecord, ActionError> {
        let record = self
            .store
            .get_file(id)
            .await
            .map_err(|e| self.report(ActionError::DetailFetchFailed(e)))?;

        let mut state = self.lock();
        state.cursor.select(id);
        state.detail = DetailView::Open {
            record: record.clone(),
        };
        tracing::debug!(%id, "opened file details");
        Ok(record)
    }

    /// Close the detail view without saving.
    pub fn dismiss_details(&self) {
        self.lock().close_detail();
    }

    /// Send `edits` for the selected file, refresh, and close the detail view.
    ///
    /// On failure the detail view stays open so the save can be retried.
    pub async fn save_changes(&self, edits: &FileEdits) -> Result<(), ActionError> {
        let selected = self.lock().cursor.require();
        let id = selected.map_err(|e| self.report(e))?;

        self.store
            .update_file(id, edits)
            .await
            .map_err(|e| self.report(ActionError::SaveFailed(e)))?;
        self.refresh()
            .await
            .map_err(|e| self.report(ActionError::SaveFailed(e)))?;

        let mut state = self.lock();
        // Another file may have been opened while the save was in flight.
        if state.cursor.is_selected(id) {
            state.close_detail();
        }
        tracing::info!(%id, "saved file changes");
        Ok(())
    }

    /// Ask for confirmation, delete `id`, and refresh.
    pub async fn delete_file(&self, id: FileId) -> Result<DeleteOutcome, ActionError> {
        let question = {
            let state = self.lock();
            match state.cache.get(id) {
                Some(record) => format!("Delete file \"{}\"?", record.display_name()),
                None => format!("Delete file {id}?"),
            }
        };
        if !self.prompt.confirm(&question).await {
            tracing::info!(%id, "delete cancelled by user");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.store
            .delete_file(id)
            .await
            .map_err(|e| self.report(ActionError::DeleteFailed(e)))?;

        tracing::info!(%id, "deleted file");

        // Cursor and detail view are only touched once the new list is in.
        self.refresh_then(|state| {
            if state.cursor.is_selected(id) {
                state.cursor.clear();
            }
            if state.detail.is_open() {
                state.close_detail();
            }
        })
        .await
        .map_err(|e| self.report(ActionError::DeleteFailed(e)))?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Delete the file open in the detail view.
    pub async fn delete_selected(&self) -> Result<DeleteOutcome, ActionError> {
        let selected = self.lock().cursor.require();
        let id = selected.map_err(|e| self.report(e))?;
        self.delete_file(id).await
    }

    /// Reconcile server storage, report the counts, and refresh only if
    /// something changed.
    pub async fn actualize(&self) -> Result<ActualizeReport, ActionError> {
        let report = self
            .store
            .actualize()
            .await
            .map_err(|e| self.report(ActionError::ActualizeFailed(e)))?;

        tracing::info!(
            added = report.added,
            removed = report.removed,
            "storage actualized"
        );
        self.prompt.notify(&Notice::Info(report.to_string()));

        if report.has_changes() {
            self.refresh()
                .await
                .map_err(|e| self.report(ActionError::ActualizeFailed(e)))?;
        }
        Ok(report)
    }

    /// Open an empty upload form.
    pub fn open_upload(&self) {
        self.lock().upload = UploadView::Open(UploadForm::default());
    }

    pub fn dismiss_upload(&self) {
        self.lock().upload = UploadView::Closed;
    }

    /// Submit `form`. On success the upload view is closed and reset and the
    /// list refreshed; on failure it stays open holding `form`.
    pub async fn upload_file(&self, form: UploadForm) -> Result<FileRecord, ActionError> {
        self.lock().upload = UploadView::Open(form.clone());

        let record = self
            .store
            .upload_file(&form)
            .await
            .map_err(|e| self.report(ActionError::upload(e)))?;

        self.lock().upload = UploadView::Closed;
        tracing::info!(id = %record.id, name = %record.display_name(), "uploaded file");

        self.refresh()
            .await
            .map_err(|e| self.report(ActionError::upload(e)))?;
        Ok(record)
    }

    /// Resubmit the form held by the open upload view.
    pub async fn retry_upload(&self) -> Option<Result<FileRecord, ActionError>> {
        let pending = match &self.lock().upload {
            UploadView::Open(form) => Some(form.clone()),
            UploadView::Closed => None,
        };
        match pending {
            Some(form) => Some(self.upload_file(form).await),
            None => None,
        }
    }

    /// Stream the selected file to `dest`. Returns the number of bytes written.
    pub async fn download(&self, dest: &Path) -> Result<u64, ActionError> {
        let selected = self.lock().cursor.require();
        let id = selected.map_err(|e| self.report(e))?;
        let written = self
            .store
            .download_file(id, dest)
            .await
            .map_err(|e| self.report(ActionError::DownloadFailed(e)))?;
        tracing::info!(%id, bytes = written, dest = %dest.display(), "downloaded file");
        Ok(written)
    }

    /// Where the selected file can be downloaded from.
    pub fn download_url(&self) -> Result<String, ActionError> {
        let selected = self.lock().cursor.require();
        let id = selected.map_err(|e| self.report(e))?;
        Ok(self.store.download_url(id))
    }

    /// Run the operation behind a row click.
    pub async fn dispatch(&self, action: RowAction) -> Result<(), ActionError> {
        match action {
            RowAction::OpenDetails(id) => self.open_details(id).await.map(|_| ()),
            RowAction::Delete(id) => self.delete_file(id).await.map(|_| ()),
        }
    }

    /// Fetch the full list, replace the cache, re-render.
    async fn refresh(&self) -> Result<usize, StoreError> {
        self.refresh_then(|_| {}).await
    }

    /// Re-fetch the list, then run `settle` on the state under the same lock
    /// that swaps the cache. `settle` never runs if the fetch fails.
    async fn refresh_then<F>(&self, settle: F) -> Result<usize, StoreError>
    where
        F: FnOnce(&mut RegistryState),
    {
        let records = self.store.list_files().await?;
        let count = records.len();

        let rows = {
            let mut state = self.lock();
            state.cache.replace(records);
            settle(&mut *state);
            if let Some(id) = state.cursor.current()
                && !state.cache.contains(id)
            {
                tracing::warn!(%id, "selected file is no longer listed by the server");
            }
            state.cache.filter(&state.filter)
        };
        tracing::debug!(count, displayed = rows.len(), "registry cache replaced");
        self.view.render(&rows, &self.handlers);
        Ok(count)
    }

    /// Log and surface `err` to the user, then hand it back for propagation.
    fn report(&self, err: ActionError) -> ActionError {
        match &err {
            ActionError::NoSelection => tracing::warn!("action needs a selected file"),
            other => tracing::error!(error = %other, "registry action failed"),
        }
        self.prompt.notify(&Notice::Error(err.user_message()));
        err
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // State is plain data and every critical section leaves it whole.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
