use thiserror::Error;

/// Generic text shown when an upload fails without a server-supplied reason.
pub const GENERIC_UPLOAD_FAILURE: &str = "File upload failed";

/// Failure of a single call against the remote store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}{}", status_suffix(.message))]
    Status { status: u16, message: Option<String> },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

fn status_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl StoreError {
    /// Human-readable reason supplied by the server in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            StoreError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// A user-triggered operation that could not complete.
///
/// Every variant is recoverable: the coordinator reports it and returns to a
/// stable state.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The operation needs a selected file and none is open.
    #[error("no file selected")]
    NoSelection,
    #[error("failed to load file list: {0}")]
    ListFetchFailed(#[source] StoreError),
    #[error("failed to load file details: {0}")]
    DetailFetchFailed(#[source] StoreError),
    #[error("failed to save changes: {0}")]
    SaveFailed(#[source] StoreError),
    #[error("failed to delete file: {0}")]
    DeleteFailed(#[source] StoreError),
    #[error("actualization failed: {0}")]
    ActualizeFailed(#[source] StoreError),
    /// `message` is the server's reason when it gave one.
    #[error("{message}")]
    UploadFailed {
        message: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to download file: {0}")]
    DownloadFailed(#[source] StoreError),
}

impl ActionError {
    pub fn upload(source: StoreError) -> Self {
        let message = source
            .server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(GENERIC_UPLOAD_FAILURE)
            .to_string();
        ActionError::UploadFailed { message, source }
    }

    /// Text of the notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::NoSelection => "No file selected.".to_string(),
            ActionError::ListFetchFailed(_) => "Could not load the file list.".to_string(),
            ActionError::DetailFetchFailed(_) => "Could not load file details.".to_string(),
            ActionError::SaveFailed(_) => "Could not save changes.".to_string(),
            ActionError::DeleteFailed(_) => "Could not delete the file.".to_string(),
            ActionError::ActualizeFailed(_) => {
                "An error occurred during actualization.".to_string()
            }
            ActionError::UploadFailed { message, .. } => message.clone(),
            ActionError::DownloadFailed(_) => "Could not download the file.".to_string(),
        }
    }
}
