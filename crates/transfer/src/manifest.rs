//! Persistent record of one multi-file upload's progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::TransferError;
use crate::store::{FileStore, UploadFile};

/// Callback invoked with the overall progress percentage (0–100).
///
/// Listeners fire synchronously on the mutating call; 100 is emitted only
/// once the manifest is complete.
pub type ProgressListener = Box<dyn Fn(u8) + Send + Sync>;

/// Mutable state of one multi-file upload, serialized as JSON so an
/// interrupted upload can resume after a process restart.
///
/// The manifest owns no I/O. Files are referenced through opaque store
/// tokens and all mutation happens through the engine: a session URL is
/// recorded while a chunk session is open, bytes are recorded per accepted
/// chunk, and [`advance`](Self::advance) moves the cursor one file forward.
/// Field names are stable across versions.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadManifest {
    name: String,
    file_count: u32,
    total_bytes: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    destination_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    active_session_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    transferred_bytes: u64,
    is_complete: bool,
    next_file_index: usize,
    file_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    share_url: String,
    #[serde(skip)]
    listeners: Vec<ProgressListener>,
}

impl UploadManifest {
    /// Builds a manifest from a file set, snapshotting the file count and
    /// total size and retaining each file in `store`.
    ///
    /// Fails if any file's length cannot be read; tokens retained before
    /// the failure are released again.
    pub fn create(
        name: impl Into<String>,
        files: &[Arc<dyn UploadFile>],
        store: &dyn FileStore,
    ) -> Result<Self, TransferError> {
        let mut total_bytes = 0u64;
        let mut file_refs: Vec<String> = Vec::with_capacity(files.len());

        for file in files {
            let size = match file.size_in_bytes() {
                Ok(size) => size,
                Err(e) => {
                    for token in &file_refs {
                        store.release(token);
                    }
                    return Err(TransferError::Io(e));
                }
            };
            total_bytes += size;
            file_refs.push(store.retain(Arc::clone(file)));
        }

        Ok(Self {
            name: name.into(),
            file_count: files.len() as u32,
            total_bytes,
            destination_path: String::new(),
            active_session_url: String::new(),
            completed_at: None,
            transferred_bytes: 0,
            // An empty file set has nothing left to upload.
            is_complete: files.is_empty(),
            next_file_index: 0,
            file_refs,
            share_url: String::new(),
            listeners: Vec::new(),
        })
    }

    /// Registers a progress listener.
    pub fn on_progress(&mut self, listener: ProgressListener) {
        self.listeners.push(listener);
    }

    /// Resolves the file the upload cursor points at, or `None` when all
    /// files are done.
    pub fn next_file(
        &self,
        store: &dyn FileStore,
    ) -> Result<Option<Arc<dyn UploadFile>>, TransferError> {
        match self.file_refs.get(self.next_file_index) {
            Some(token) => store.resolve(token).map(Some),
            None => Ok(None),
        }
    }

    /// Marks the current file as uploaded: clears the session URL and moves
    /// the cursor forward. When the last file completes, the manifest
    /// becomes terminal, retained tokens are released and a single 100%
    /// notification fires. No-op once complete.
    pub fn advance(&mut self, store: &dyn FileStore) {
        if self.is_complete {
            return;
        }

        self.active_session_url.clear();
        self.next_file_index += 1;

        if self.next_file_index < self.file_refs.len() {
            return;
        }

        self.is_complete = true;
        self.completed_at = Some(Utc::now());
        self.transferred_bytes = self.total_bytes;
        for token in &self.file_refs {
            store.release(token);
        }
        self.emit_progress();
    }

    /// Records `n` bytes acknowledged by the remote and notifies listeners.
    pub fn record_bytes(&mut self, n: u64) {
        self.transferred_bytes += n;
        self.emit_progress();
    }

    /// Undoes partial progress for the file in flight: resets the byte
    /// counter and forgets the session URL. Fires no notification.
    pub fn rollback(&mut self, to_bytes: u64) {
        self.transferred_bytes = to_bytes;
        self.active_session_url.clear();
    }

    /// Overall progress as a whole percentage.
    ///
    /// 100 is reserved for a complete manifest; a fully transferred but
    /// not yet advanced one reports 99.
    pub fn percent(&self) -> u8 {
        if self.is_complete {
            return 100;
        }
        if self.total_bytes == 0 {
            return 0;
        }
        let p = self.transferred_bytes.saturating_mul(100) / self.total_bytes;
        p.min(99) as u8
    }

    fn emit_progress(&self) {
        let percent = self.percent();
        for listener in &self.listeners {
            listener(percent);
        }
    }

    /// Serializes the manifest to JSON.
    pub fn to_json(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a manifest from JSON. Listeners are not persisted and must
    /// be re-registered.
    pub fn from_json(json: &str) -> Result<Self, TransferError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_count(&self) -> u32 {
        self.file_count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn next_file_index(&self) -> usize {
        self.next_file_index
    }

    pub fn destination_path(&self) -> &str {
        &self.destination_path
    }

    /// Records the destination container once it exists at the remote.
    pub fn set_destination_path(&mut self, path: impl Into<String>) {
        self.destination_path = path.into();
    }

    pub fn active_session_url(&self) -> &str {
        &self.active_session_url
    }

    /// Records the chunk-session endpoint for the file in flight.
    pub fn set_active_session_url(&mut self, url: impl Into<String>) {
        self.active_session_url = url.into();
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn share_url(&self) -> &str {
        &self.share_url
    }

    /// Stores the share link. Set once, after completion.
    pub fn set_share_url(&mut self, url: impl Into<String>) {
        self.share_url = url.into();
    }
}
