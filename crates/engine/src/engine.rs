//! Storage client trait and the upload driver.
//!
//! `StorageClient` is the seam between upload logic and the wire: the
//! engine only ever sees the five remote operations it needs, which keeps
//! the driver testable with mocks. [`sharelift_client::DriveClient`]
//! implements it for the real HTTP API.

use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;

use sharelift_client::{ContentRange, DriveClient, RangeStatus};
use sharelift_transfer::{CHUNK_SIZE, ChunkReader, FileStore, UploadManifest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::UploadError;

/// Remote operations the engine depends on.
pub trait StorageClient: Send + Sync {
    /// Idempotently creates every segment of a destination container path.
    /// Returns `true` if the leaf segment was newly created.
    fn ensure_folder<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UploadError>> + Send + 'a>>;

    /// Opens a chunk session for the item at `item_path` and returns the
    /// session's upload URL.
    fn create_session<'a>(
        &'a self,
        item_path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>>;

    /// PUTs one byte range against an open session.
    fn put_range<'a>(
        &'a self,
        upload_url: &'a str,
        range: ContentRange,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<RangeStatus, UploadError>> + Send + 'a>>;

    /// Aborts an open session.
    fn delete_session<'a>(
        &'a self,
        upload_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>>;

    /// Requests a view-type share link for an item or container.
    fn create_share_link<'a>(
        &'a self,
        item_path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>>;
}

impl StorageClient for DriveClient {
    fn ensure_folder<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UploadError>> + Send + 'a>> {
        Box::pin(async move { Ok(DriveClient::ensure_folder(self, path).await?) })
    }

    fn create_session<'a>(
        &'a self,
        item_path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>> {
        Box::pin(async move { Ok(DriveClient::create_session(self, item_path).await?) })
    }

    fn put_range<'a>(
        &'a self,
        upload_url: &'a str,
        range: ContentRange,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<RangeStatus, UploadError>> + Send + 'a>> {
        Box::pin(async move { Ok(DriveClient::put_range(self, upload_url, range, data).await?) })
    }

    fn delete_session<'a>(
        &'a self,
        upload_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
        Box::pin(async move { Ok(DriveClient::delete_session(self, upload_url).await?) })
    }

    fn create_share_link<'a>(
        &'a self,
        item_path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>> {
        Box::pin(async move { Ok(DriveClient::create_share_link(self, item_path).await?) })
    }
}

/// Drives one manifest's upload end to end.
///
/// Files are uploaded strictly sequentially, chunks within a file
/// strictly sequentially; at most one chunk session is open at a time.
/// One engine instance owns one manifest per [`run`](Self::run) call —
/// concurrent runs over the same manifest are not supported.
pub struct UploadEngine {
    client: Arc<dyn StorageClient>,
    store: Arc<dyn FileStore>,
    chunk_size: usize,
    cancel: CancellationToken,
}

impl UploadEngine {
    /// Creates an engine around an authenticated client and a file store.
    pub fn new(client: Arc<dyn StorageClient>, store: Arc<dyn FileStore>) -> Self {
        Self {
            client,
            store,
            chunk_size: CHUNK_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the chunk size. 0 keeps the default.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        if chunk_size > 0 {
            self.chunk_size = chunk_size;
        }
        self
    }

    /// Returns a cancellation token for this engine.
    ///
    /// Cancellation is observed before each session open and each chunk
    /// read and takes the same abort path as a remote failure: the open
    /// session is deleted and the manifest rolled back to the start of
    /// the file in flight.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Idempotently creates the destination container. A segment that
    /// already exists is not an error; any other creation failure
    /// propagates.
    pub async fn ensure_destination(&self, path: &str) -> Result<bool, UploadError> {
        self.client.ensure_folder(path).await
    }

    /// Runs the upload until the manifest completes or a file fails.
    ///
    /// On failure the manifest stays valid and positioned at the start of
    /// the failed file; calling `run` again with the same manifest
    /// resumes from there. No retry happens internally.
    pub async fn run(
        &self,
        destination: &str,
        manifest: &mut UploadManifest,
    ) -> Result<(), UploadError> {
        debug!(
            name = %manifest.name(),
            files = manifest.file_count(),
            total_bytes = manifest.total_bytes(),
            "starting upload run"
        );

        if manifest.destination_path().is_empty() {
            let created = self.ensure_destination(destination).await?;
            debug!(destination, created, "destination container ready");
            manifest.set_destination_path(destination);
        }

        let mut last_item_path = String::new();

        while !manifest.is_complete() {
            let before = manifest.transferred_bytes();

            match self.upload_next_file(manifest).await {
                Ok(Some(item_path)) => {
                    info!(item = %item_path, "file uploaded");
                    last_item_path = item_path;
                    manifest.advance(self.store.as_ref());
                }
                Ok(None) => break,
                Err(e) => {
                    let session = manifest.active_session_url().to_string();
                    if !session.is_empty() {
                        if let Err(del_err) = self.client.delete_session(&session).await {
                            warn!(error = %del_err, "failed to delete upload session");
                        }
                    }
                    manifest.rollback(before);
                    return Err(e);
                }
            }
        }

        if manifest.is_complete() && manifest.share_url().is_empty() {
            // One file shares the file itself, anything else the container.
            let target = if manifest.file_count() == 1 && !last_item_path.is_empty() {
                last_item_path
            } else {
                manifest.destination_path().to_string()
            };
            let link = self.client.create_share_link(&target).await?;
            info!(share_url = %link, "share link created");
            manifest.set_share_url(link);
        }

        Ok(())
    }

    /// Uploads the file at the manifest cursor and returns its item path,
    /// or `None` when no files remain. Does not advance the manifest.
    async fn upload_next_file(
        &self,
        manifest: &mut UploadManifest,
    ) -> Result<Option<String>, UploadError> {
        let Some(file) = manifest.next_file(self.store.as_ref())? else {
            return Ok(None);
        };

        let item_path = format!(
            "{}/{}",
            manifest.destination_path().trim_end_matches('/'),
            file.name()
        );

        self.check_cancelled()?;
        if manifest.active_session_url().is_empty() {
            let session_url = self.client.create_session(&item_path).await?;
            debug!(item = %item_path, "upload session opened");
            manifest.set_active_session_url(session_url);
        }

        let opened = Arc::clone(&file);
        let (total, stream) = tokio::task::spawn_blocking(
            move || -> std::io::Result<(u64, Box<dyn Read + Send>)> {
                let total = opened.size_in_bytes()?;
                let stream = opened.open_read()?;
                Ok((total, stream))
            },
        )
        .await
        .map_err(|e| UploadError::Upload(format!("task join error: {e}")))??;

        let mut reader = ChunkReader::new(stream, total, self.chunk_size);

        loop {
            self.check_cancelled()?;

            let (returned, chunk) = tokio::task::spawn_blocking(move || {
                let chunk = reader.next_chunk();
                (reader, chunk)
            })
            .await
            .map_err(|e| UploadError::Upload(format!("task join error: {e}")))?;
            reader = returned;

            let Some(chunk) = chunk? else {
                break;
            };

            let len = chunk.size;
            let range = ContentRange::for_chunk(chunk.offset, len, total);
            let status = self
                .client
                .put_range(manifest.active_session_url(), range, chunk.data)
                .await?;
            manifest.record_bytes(len as u64);

            match status {
                RangeStatus::Complete => break,
                RangeStatus::Accepted => {}
            }
        }

        Ok(Some(item_path))
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}
