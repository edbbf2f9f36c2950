//! Remote store contract and its implementations.

pub mod http;
pub mod mock;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::StoreError;
use crate::{ActualizeReport, FileEdits, FileId, FileRecord, UploadForm};

pub use http::HttpFileStore;

/// Boxed future returned by every [`FileStore`] call.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// The registry server, as seen by the client.
///
/// Each method maps onto one HTTP endpoint. Implementations report non-2xx
/// responses as [`StoreError::Status`] carrying the server's message when the
/// body has one.
pub trait FileStore: Send + Sync {
    /// `GET /files`: every record, in server order.
    fn list_files(&self) -> StoreFuture<'_, Vec<FileRecord>>;

    /// `GET /files/{id}`.
    fn get_file(&self, id: FileId) -> StoreFuture<'_, FileRecord>;

    /// `PUT /files/{id}/update` with `{name, path, comment}`.
    fn update_file<'a>(&'a self, id: FileId, edits: &'a FileEdits) -> StoreFuture<'a, ()>;

    /// `DELETE /files/{id}/delete`.
    fn delete_file(&self, id: FileId) -> StoreFuture<'_, ()>;

    /// `POST /actualize`: reconcile stored metadata against the backing storage.
    fn actualize(&self) -> StoreFuture<'_, ActualizeReport>;

    /// `POST /files/upload` as multipart form data.
    fn upload_file<'a>(&'a self, form: &'a UploadForm) -> StoreFuture<'a, FileRecord>;

    /// `GET /files/{id}/download`, written to `dest`. Returns the byte count.
    fn download_file<'a>(&'a self, id: FileId, dest: &'a Path) -> StoreFuture<'a, u64>;

    /// Address of the download endpoint, for front ends that hand the transfer off.
    fn download_url(&self, id: FileId) -> String;

    /// `GET /ping`.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
