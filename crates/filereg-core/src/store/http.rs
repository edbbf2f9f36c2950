//! [`FileStore`] over HTTP with a shared `reqwest::Client`.

use std::path::Path;

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use super::{FileStore, StoreFuture};
use crate::error::StoreError;
use crate::{ActualizeReport, Config, FileEdits, FileId, FileRecord, UploadForm};

/// Registry server reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFileStore {
    client: reqwest::Client,
    base_url: String,
}

/// Error body shapes the server uses: `{"message": ...}` for upload
/// rejections, `{"error": ...}` elsewhere.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl HttpFileStore {
    /// Build a store with its own client, applying the configured timeout.
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Pass 2xx responses through; turn anything else into [`StoreError::Status`].
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message.or(body.error));
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

impl FileStore for HttpFileStore {
    fn list_files(&self) -> StoreFuture<'_, Vec<FileRecord>> {
        Box::pin(async move {
            let url = self.url("/files");
            tracing::debug!(method = "GET", url = %url, "registry request");
            let resp = check(self.client.get(&url).send().await?).await?;
            Ok(resp.json::<Vec<FileRecord>>().await?)
        })
    }

    fn get_file(&self, id: FileId) -> StoreFuture<'_, FileRecord> {
        Box::pin(async move {
            let url = self.url(&format!("/files/{id}"));
            tracing::debug!(method = "GET", url = %url, "registry request");
            let resp = check(self.client.get(&url).send().await?).await?;
            Ok(resp.json::<FileRecord>().await?)
        })
    }

    fn update_file<'a>(&'a self, id: FileId, edits: &'a FileEdits) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(&format!("/files/{id}/update"));
            tracing::debug!(method = "PUT", url = %url, "registry request");
            // The body echoes the updated record; the caller re-fetches the list anyway.
            check(self.client.put(&url).json(edits).send().await?).await?;
            Ok(())
        })
    }

    fn delete_file(&self, id: FileId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let url = self.url(&format!("/files/{id}/delete"));
            tracing::debug!(method = "DELETE", url = %url, "registry request");
            check(self.client.delete(&url).send().await?).await?;
            Ok(())
        })
    }

    fn actualize(&self) -> StoreFuture<'_, ActualizeReport> {
        Box::pin(async move {
            let url = self.url("/actualize");
            tracing::debug!(method = "POST", url = %url, "registry request");
            let resp = check(self.client.post(&url).send().await?).await?;
            Ok(resp.json::<ActualizeReport>().await?)
        })
    }

    fn upload_file<'a>(&'a self, form: &'a UploadForm) -> StoreFuture<'a, FileRecord> {
        Box::pin(async move {
            let url = self.url("/files/upload");
            tracing::debug!(
                method = "POST",
                url = %url,
                bytes = form.contents.len(),
                "registry request"
            );
            let part = reqwest::multipart::Part::bytes(form.contents.clone())
                .file_name(form.source_name.clone());
            let multipart = reqwest::multipart::Form::new()
                .part("file", part)
                .text("filename", form.name.clone())
                .text("path", form.path.clone())
                .text("comment", form.comment.clone());
            let resp = check(self.client.post(&url).multipart(multipart).send().await?).await?;
            Ok(resp.json::<FileRecord>().await?)
        })
    }

    fn download_file<'a>(&'a self, id: FileId, dest: &'a Path) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let url = self.download_url(id);
            tracing::debug!(method = "GET", url = %url, dest = %dest.display(), "registry request");
            let resp = check(self.client.get(&url).send().await?).await?;
            write_body(resp.bytes_stream(), dest).await
        })
    }

    fn download_url(&self, id: FileId) -> String {
        self.url(&format!("/files/{id}/download"))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let url = self.url("/ping");
            tracing::debug!(method = "GET", url = %url, "registry request");
            check(self.client.get(&url).send().await?).await?;
            Ok(())
        })
    }
}

/// Stream `body` into a new file at `dest` and return the byte count. If the
/// body or a write fails part way, the truncated file is removed.
async fn write_body<S, B, E>(body: S, dest: &Path) -> Result<u64, StoreError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    StoreError: From<E>,
{
    let mut file = tokio::fs::File::create(dest).await?;
    let copied = copy_body(body, &mut file).await;
    if copied.is_err() {
        drop(file);
        if let Err(e) = tokio::fs::remove_file(dest).await {
            tracing::warn!(dest = %dest.display(), error = %e, "could not remove partial download");
        }
    }
    copied
}

async fn copy_body<S, B, E>(body: S, file: &mut tokio::fs::File) -> Result<u64, StoreError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    StoreError: From<E>,
{
    let mut body = std::pin::pin!(body);
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(chunk.as_ref()).await?;
        written += chunk.as_ref().len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
