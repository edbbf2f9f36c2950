//! Integration tests for the [`ActionCoordinator`].
//!
//! All tests run against the in-memory [`MockStore`], so no HTTP requests are
//! made. The view and prompt are recording doubles.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filereg_core::store::mock::{Call, MockFailure, MockStore, Op};
use filereg_core::{
    ActionCoordinator, ActionError, ActualizeReport, DeleteOutcome, DetailView, FileEdits, FileId,
    FileRecord, Notice, RegistryView, RowAction, RowHandlers, SearchFilter, UploadForm,
    UploadView, UserPrompt,
};
use tokio::sync::mpsc::UnboundedReceiver;

fn record(id: i64, name: &str, path: &str) -> FileRecord {
    FileRecord {
        id: FileId(id),
        name: name.to_string(),
        extension: String::new(),
        size: 10,
        path: path.to_string(),
        created_at: "Mon, 01 Jan 2024 00:00:00 GMT".to_string(),
        updated_at: None,
        comment: None,
    }
}

fn sample_records() -> Vec<FileRecord> {
    vec![record(1, "a.txt", "/x"), record(2, "b.log", "/y")]
}

/// Remembers the ids of every rendered table.
#[derive(Default)]
struct RecordingView {
    renders: Mutex<Vec<Vec<FileId>>>,
}

impl RecordingView {
    fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    fn last_render(&self) -> Option<Vec<FileId>> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl RegistryView for RecordingView {
    fn render(&self, rows: &[FileRecord], _handlers: &RowHandlers) {
        self.renders
            .lock()
            .unwrap()
            .push(rows.iter().map(|r| r.id).collect());
    }
}

/// Answers confirmations from a script (default: yes) and records notices.
#[derive(Default)]
struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    questions: Mutex<Vec<String>>,
    notices: Mutex<Vec<Notice>>,
}

impl ScriptedPrompt {
    fn answer_next(&self, yes: bool) {
        self.answers.lock().unwrap().push_back(yes);
    }

    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    fn last_notice(&self) -> Option<Notice> {
        self.notices.lock().unwrap().last().cloned()
    }
}

impl UserPrompt for ScriptedPrompt {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn confirm<'a>(&'a self, question: &'a str) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        self.questions.lock().unwrap().push(question.to_string());
        let answer = self.answers.lock().unwrap().pop_front().unwrap_or(true);
        Box::pin(async move { answer })
    }
}

struct Harness {
    coordinator: ActionCoordinator<MockStore>,
    view: Arc<RecordingView>,
    prompt: Arc<ScriptedPrompt>,
    rows_rx: UnboundedReceiver<RowAction>,
}

impl Harness {
    fn new(records: Vec<FileRecord>) -> Self {
        let view = Arc::new(RecordingView::default());
        let prompt = Arc::new(ScriptedPrompt::default());
        let (handlers, rows_rx) = RowHandlers::channel();
        let coordinator =
            ActionCoordinator::new(MockStore::new(records), view.clone(), prompt.clone(), handlers);
        Self {
            coordinator,
            view,
            prompt,
            rows_rx,
        }
    }

    /// A harness whose cache has been loaded once.
    async fn loaded(records: Vec<FileRecord>) -> Self {
        let harness = Self::new(records);
        harness.coordinator.load().await.unwrap();
        harness
    }

    fn store(&self) -> &MockStore {
        self.coordinator.store()
    }
}

fn edits(name: &str, path: &str, comment: &str) -> FileEdits {
    FileEdits {
        name: name.to_string(),
        path: path.to_string(),
        comment: comment.to_string(),
    }
}

fn upload_form(name: &str) -> UploadForm {
    UploadForm {
        source_name: name.to_string(),
        contents: b"hello world".to_vec(),
        name: name.to_string(),
        path: "/docs".to_string(),
        comment: "fresh".to_string(),
    }
}

// ── load / search ─────────────────────────────────────────────────

#[tokio::test]
async fn load_replaces_cache_and_renders() {
    let h = Harness::new(sample_records());
    assert!(h.coordinator.records().is_empty());

    let count = h.coordinator.load().await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(h.coordinator.records(), sample_records());
    assert_eq!(h.view.last_render(), Some(vec![FileId(1), FileId(2)]));
}

#[tokio::test]
async fn load_failure_is_reported() {
    let h = Harness::new(sample_records());
    h.store()
        .fail_next(Op::List, MockFailure::Transport("connection refused".into()));

    let err = h.coordinator.load().await.unwrap_err();

    assert!(matches!(err, ActionError::ListFetchFailed(_)));
    assert!(h.coordinator.records().is_empty());
    assert!(matches!(h.prompt.last_notice(), Some(Notice::Error(_))));
    assert_eq!(h.view.render_count(), 0);
}

#[tokio::test]
async fn search_filters_by_name_without_remote_call() {
    let h = Harness::loaded(sample_records()).await;
    let calls_before = h.store().calls().len();

    let rows = h.coordinator.apply_search(SearchFilter::new("a", ""));

    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![FileId(1)]);
    assert_eq!(h.view.last_render(), Some(vec![FileId(1)]));
    assert_eq!(h.store().calls().len(), calls_before);
    // The cache itself is untouched.
    assert_eq!(h.coordinator.records().len(), 2);
}

#[tokio::test]
async fn refresh_after_mutation_keeps_search_applied() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.apply_search(SearchFilter::by_path("/y"));
    h.store()
        .stage_scan(vec![record(3, "c.log", "/y"), record(4, "d.txt", "/z")], vec![]);

    h.coordinator.actualize().await.unwrap();

    assert_eq!(h.coordinator.records().len(), 4);
    assert_eq!(h.view.last_render(), Some(vec![FileId(2), FileId(3)]));
    assert_eq!(h.coordinator.displayed().len(), 2);
}

// ── details / selection ───────────────────────────────────────────

#[tokio::test]
async fn open_details_selects_and_opens() {
    let h = Harness::loaded(sample_records()).await;

    let record = h.coordinator.open_details(FileId(2)).await.unwrap();

    assert_eq!(record.name, "b.log");
    assert_eq!(h.coordinator.selection(), Some(FileId(2)));
    assert_eq!(
        h.coordinator.detail(),
        DetailView::Open {
            record: record.clone()
        }
    );
}

#[tokio::test]
async fn opening_another_file_replaces_selection() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.coordinator.open_details(FileId(2)).await.unwrap();

    assert_eq!(h.coordinator.selection(), Some(FileId(2)));
    assert_eq!(
        h.coordinator.detail().record().map(|r| r.id),
        Some(FileId(2))
    );
}

#[tokio::test]
async fn failed_detail_fetch_leaves_cursor_unchanged() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.store().fail_next(
        Op::Get,
        MockFailure::Status {
            status: 500,
            message: None,
        },
    );

    let err = h.coordinator.open_details(FileId(2)).await.unwrap_err();

    assert!(matches!(err, ActionError::DetailFetchFailed(_)));
    assert_eq!(h.coordinator.selection(), Some(FileId(1)));
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("Could not load file details.".into()))
    );
}

#[tokio::test]
async fn dismiss_closes_detail_and_clears_selection() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();

    h.coordinator.dismiss_details();

    assert_eq!(h.coordinator.detail(), DetailView::Closed);
    assert_eq!(h.coordinator.selection(), None);
}

// ── save ──────────────────────────────────────────────────────────

#[tokio::test]
async fn save_without_selection_fails_locally() {
    let h = Harness::loaded(sample_records()).await;
    let calls_before = h.store().calls();

    let err = h
        .coordinator
        .save_changes(&edits("n", "/p", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::NoSelection));
    assert_eq!(h.store().calls(), calls_before);
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("No file selected.".into()))
    );
}

#[tokio::test]
async fn save_sends_edits_refetches_and_closes_detail() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    // Another client changes a different record meanwhile.
    h.store().modify_record(FileId(2), |r| r.size = 999);

    h.coordinator
        .save_changes(&edits("renamed.txt", "/x/sub", "note"))
        .await
        .unwrap();

    assert!(
        h.store()
            .calls()
            .contains(&Call::Update(FileId(1), edits("renamed.txt", "/x/sub", "note")))
    );
    // Cache is exactly the server's list, including the other client's change.
    assert_eq!(h.coordinator.records(), h.store().records());
    assert_eq!(h.coordinator.records()[1].size, 999);
    assert_eq!(h.coordinator.detail(), DetailView::Closed);
    assert_eq!(h.coordinator.selection(), None);
}

#[tokio::test]
async fn failed_save_keeps_detail_open_for_retry() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.store().fail_next(
        Op::Update,
        MockFailure::Status {
            status: 500,
            message: Some("disk full".into()),
        },
    );
    let lists_before = h.store().call_count(Op::List);

    let err = h
        .coordinator
        .save_changes(&edits("x", "/x", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::SaveFailed(_)));
    assert!(h.coordinator.detail().is_open());
    assert_eq!(h.coordinator.selection(), Some(FileId(1)));
    assert_eq!(h.store().call_count(Op::List), lists_before);
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("Could not save changes.".into()))
    );

    // Retry succeeds.
    h.coordinator
        .save_changes(&edits("x", "/x", ""))
        .await
        .unwrap();
    assert_eq!(h.coordinator.detail(), DetailView::Closed);
}

#[tokio::test]
async fn refetch_failure_after_save_is_a_save_failure() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.store()
        .fail_next(Op::List, MockFailure::Transport("timeout".into()));

    let err = h
        .coordinator
        .save_changes(&edits("z", "/x", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::SaveFailed(_)));
    assert!(h.coordinator.detail().is_open());
    // Cache still holds the previous snapshot.
    assert_eq!(h.coordinator.records(), sample_records());
}

// ── delete ────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_selected_file_clears_cursor_and_closes_detail() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(2)).await.unwrap();
    assert_eq!(h.coordinator.selection(), Some(FileId(2)));

    let outcome = h.coordinator.delete_file(FileId(2)).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(h.coordinator.records(), vec![record(1, "a.txt", "/x")]);
    assert_eq!(h.coordinator.selection(), None);
    assert_eq!(h.coordinator.detail(), DetailView::Closed);
    assert_eq!(h.view.last_render(), Some(vec![FileId(1)]));
    assert_eq!(
        h.prompt.questions.lock().unwrap().as_slice(),
        ["Delete file \"b.log\"?"]
    );
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.prompt.answer_next(false);

    let outcome = h.coordinator.delete_file(FileId(1)).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(h.store().call_count(Op::Delete), 0);
    assert_eq!(h.coordinator.selection(), Some(FileId(1)));
    assert!(h.coordinator.detail().is_open());
    assert_eq!(h.coordinator.records().len(), 2);
}

#[tokio::test]
async fn failed_delete_leaves_state_unchanged() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.store().fail_next(
        Op::Delete,
        MockFailure::Status {
            status: 404,
            message: Some("File not found".into()),
        },
    );

    let err = h.coordinator.delete_file(FileId(1)).await.unwrap_err();

    assert!(matches!(err, ActionError::DeleteFailed(_)));
    assert_eq!(h.coordinator.selection(), Some(FileId(1)));
    assert!(h.coordinator.detail().is_open());
    assert_eq!(h.coordinator.records(), sample_records());
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("Could not delete the file.".into()))
    );
}

#[tokio::test]
async fn deleting_another_row_closes_open_detail() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();

    h.coordinator.delete_file(FileId(2)).await.unwrap();

    assert_eq!(h.coordinator.detail(), DetailView::Closed);
    assert_eq!(h.coordinator.selection(), None);
    assert_eq!(h.coordinator.records(), vec![record(1, "a.txt", "/x")]);
}

#[tokio::test]
async fn delete_refetch_failure_keeps_cursor_detail_and_cache() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(2)).await.unwrap();
    h.store()
        .fail_next(Op::List, MockFailure::Transport("connection reset".into()));

    let err = h.coordinator.delete_file(FileId(2)).await.unwrap_err();

    assert!(matches!(err, ActionError::DeleteFailed(_)));
    assert_eq!(h.coordinator.selection(), Some(FileId(2)));
    assert!(h.coordinator.detail().is_open());
    assert_eq!(h.coordinator.records(), sample_records());
    assert_eq!(h.store().records(), vec![record(1, "a.txt", "/x")]);
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("Could not delete the file.".into()))
    );

    // The next successful fetch catches up with the server.
    h.coordinator.load().await.unwrap();
    assert_eq!(h.coordinator.records(), vec![record(1, "a.txt", "/x")]);
}

#[tokio::test]
async fn delete_selected_requires_selection() {
    let h = Harness::loaded(sample_records()).await;

    let err = h.coordinator.delete_selected().await.unwrap_err();

    assert!(matches!(err, ActionError::NoSelection));
    assert!(h.prompt.questions.lock().unwrap().is_empty());
    assert_eq!(h.store().call_count(Op::Delete), 0);
}

#[tokio::test]
async fn delete_selected_deletes_open_file() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();

    h.coordinator.delete_selected().await.unwrap();

    assert!(h.store().calls().contains(&Call::Delete(FileId(1))));
    assert_eq!(h.coordinator.selection(), None);
}

// ── actualize ─────────────────────────────────────────────────────

#[tokio::test]
async fn noop_actualize_reports_without_refetch() {
    let h = Harness::loaded(sample_records()).await;
    let lists_before = h.store().call_count(Op::List);
    let renders_before = h.view.render_count();

    let report = h.coordinator.actualize().await.unwrap();

    assert_eq!(report, ActualizeReport::default());
    assert_eq!(h.store().call_count(Op::List), lists_before);
    assert_eq!(h.view.render_count(), renders_before);
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Info("Added: 0, Removed: 0".into()))
    );
}

#[tokio::test]
async fn actualize_with_changes_refetches() {
    let h = Harness::loaded(sample_records()).await;
    h.store()
        .stage_scan(vec![record(7, "found.bin", "/x")], vec![FileId(1)]);

    let report = h.coordinator.actualize().await.unwrap();

    assert_eq!(report, ActualizeReport { added: 1, removed: 1 });
    let ids: Vec<_> = h.coordinator.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![FileId(2), FileId(7)]);
    assert_eq!(
        h.prompt.notices()[0],
        Notice::Info("Added: 1, Removed: 1".into())
    );
}

#[tokio::test]
async fn actualize_failure_is_reported() {
    let h = Harness::loaded(sample_records()).await;
    h.store()
        .fail_next(Op::Actualize, MockFailure::Transport("reset".into()));

    let err = h.coordinator.actualize().await.unwrap_err();

    assert!(matches!(err, ActionError::ActualizeFailed(_)));
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("An error occurred during actualization.".into()))
    );
}

// ── upload ────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_rejection_reports_server_message() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_upload();
    h.store().fail_next(
        Op::Upload,
        MockFailure::Status {
            status: 400,
            message: Some("bad extension".into()),
        },
    );
    let form = upload_form("evil.exe");

    let err = h.coordinator.upload_file(form.clone()).await.unwrap_err();

    assert_eq!(err.user_message(), "bad extension");
    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("bad extension".into()))
    );
    assert_eq!(h.coordinator.records(), sample_records());
    assert_eq!(h.coordinator.upload_view(), UploadView::Open(form));
}

#[tokio::test]
async fn upload_failure_without_message_is_generic() {
    let h = Harness::loaded(sample_records()).await;
    h.store()
        .fail_next(Op::Upload, MockFailure::Transport("broken pipe".into()));

    h.coordinator
        .upload_file(upload_form("x.txt"))
        .await
        .unwrap_err();

    assert_eq!(
        h.prompt.last_notice(),
        Some(Notice::Error("File upload failed".into()))
    );
}

#[tokio::test]
async fn upload_success_closes_view_and_refetches() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_upload();

    let created = h
        .coordinator
        .upload_file(upload_form("report.pdf"))
        .await
        .unwrap();

    assert_eq!(created.name, "report");
    assert_eq!(created.extension, ".pdf");
    assert_eq!(h.coordinator.upload_view(), UploadView::Closed);
    assert_eq!(h.coordinator.records(), h.store().records());
    assert!(h.coordinator.records().iter().any(|r| r.id == created.id));
}

#[tokio::test]
async fn upload_refetch_failure_closes_view_and_keeps_cache() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_upload();
    h.store()
        .fail_next(Op::List, MockFailure::Transport("connection reset".into()));

    let err = h
        .coordinator
        .upload_file(upload_form("late.txt"))
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::UploadFailed { .. }));
    assert_eq!(err.user_message(), "File upload failed");
    // The server kept the file, so there is no form left to resubmit.
    assert_eq!(h.coordinator.upload_view(), UploadView::Closed);
    assert!(h.coordinator.retry_upload().await.is_none());
    assert_eq!(h.coordinator.records(), sample_records());
    assert_eq!(h.store().records().len(), 3);
    assert_eq!(h.store().call_count(Op::Upload), 1);
}

#[tokio::test]
async fn retry_upload_resubmits_held_form() {
    let h = Harness::loaded(sample_records()).await;
    assert!(h.coordinator.retry_upload().await.is_none());

    h.store().fail_next(
        Op::Upload,
        MockFailure::Status {
            status: 500,
            message: Some("try again".into()),
        },
    );
    h.coordinator
        .upload_file(upload_form("retry.txt"))
        .await
        .unwrap_err();

    let created = h.coordinator.retry_upload().await.unwrap().unwrap();

    assert_eq!(created.name, "retry");
    assert_eq!(h.store().call_count(Op::Upload), 2);
    assert!(!h.coordinator.upload_view().is_open());
}

// ── download ──────────────────────────────────────────────────────

#[tokio::test]
async fn download_requires_selection() {
    let h = Harness::loaded(sample_records()).await;
    let dir = tempfile::tempdir().unwrap();

    let err = h
        .coordinator
        .download(&dir.path().join("out"))
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::NoSelection));
    assert_eq!(h.store().call_count(Op::Download), 0);
    assert!(matches!(
        h.coordinator.download_url(),
        Err(ActionError::NoSelection)
    ));
}

#[tokio::test]
async fn download_writes_selected_file() {
    let h = Harness::loaded(vec![]).await;
    let created = h
        .coordinator
        .upload_file(upload_form("hello.txt"))
        .await
        .unwrap();
    h.coordinator.open_details(created.id).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("hello.txt");

    let written = h.coordinator.download(&dest).await.unwrap();

    assert_eq!(written, 11);
    assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    assert_eq!(
        h.coordinator.download_url().unwrap(),
        format!("mock://files/{}/download", created.id)
    );
}

// ── row handlers ──────────────────────────────────────────────────

#[tokio::test]
async fn row_clicks_are_dispatched_through_the_channel() {
    let mut h = Harness::loaded(sample_records()).await;

    h.coordinator.handlers().open_file_details(FileId(2));
    h.coordinator.handlers().delete_file(FileId(1));

    let first = h.rows_rx.recv().await.unwrap();
    assert_eq!(first, RowAction::OpenDetails(FileId(2)));
    h.coordinator.dispatch(first).await.unwrap();
    assert_eq!(h.coordinator.selection(), Some(FileId(2)));

    let second = h.rows_rx.recv().await.unwrap();
    assert_eq!(second, RowAction::Delete(FileId(1)));
    h.coordinator.dispatch(second).await.unwrap();
    assert_eq!(h.coordinator.records(), vec![record(2, "b.log", "/y")]);
}

// ── overlapping operations ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn overlapping_refreshes_last_response_wins() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.store().stage_scan(vec![record(3, "c.txt", "/z")], vec![]);
    // Save's list fetch is issued first but delivered last.
    h.store().delay_next(Op::List, Duration::from_millis(50));
    h.store().delay_next(Op::List, Duration::from_millis(10));

    let renamed = edits("a2.txt", "/x", "");
    let (saved, actualized) = tokio::join!(
        h.coordinator.save_changes(&renamed),
        h.coordinator.actualize(),
    );
    saved.unwrap();
    actualized.unwrap();

    // The cache holds one complete snapshot: the older one, taken before the
    // actualize added record 3.
    let ids: Vec<_> = h.coordinator.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![FileId(1), FileId(2)]);
    assert_eq!(h.coordinator.records()[0].name, "a2.txt");

    // The next refresh converges on the server state.
    h.coordinator.load().await.unwrap();
    assert_eq!(h.coordinator.records(), h.store().records());
}

#[tokio::test(start_paused = true)]
async fn overlapping_refreshes_in_order_end_fresh() {
    let h = Harness::loaded(sample_records()).await;
    h.coordinator.open_details(FileId(1)).await.unwrap();
    h.store().stage_scan(vec![record(3, "c.txt", "/z")], vec![]);
    h.store().delay_next(Op::List, Duration::from_millis(10));
    h.store().delay_next(Op::List, Duration::from_millis(50));

    let renamed = edits("a2.txt", "/x", "");
    let (saved, actualized) = tokio::join!(
        h.coordinator.save_changes(&renamed),
        h.coordinator.actualize(),
    );
    saved.unwrap();
    actualized.unwrap();

    assert_eq!(h.coordinator.records(), h.store().records());
    assert_eq!(h.coordinator.records().len(), 3);
}
