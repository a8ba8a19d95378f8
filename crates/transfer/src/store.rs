//! Opaque file access: the manifest holds tokens, not paths.
//!
//! `FileStore` mirrors the platform access list the UI layer feeds us:
//! files are retained under a minted token when a manifest is created and
//! resolved again each time the engine needs to read one. Tokens survive
//! manifest serialization; the store itself is the caller's concern.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::TransferError;

/// A readable file with a known length.
///
/// Implementations must hand out a fresh sequential stream on every
/// `open_read` call; the engine re-reads a file from the start when it
/// retries after an abort.
pub trait UploadFile: Send + Sync {
    /// File name as it should appear at the destination.
    fn name(&self) -> &str;

    /// Current length in bytes.
    fn size_in_bytes(&self) -> std::io::Result<u64>;

    /// Opens a sequential read stream positioned at byte 0.
    fn open_read(&self) -> std::io::Result<Box<dyn Read + Send>>;
}

/// Token registry for retained files.
pub trait FileStore: Send + Sync {
    /// Registers a file and returns a token for later retrieval.
    fn retain(&self, file: Arc<dyn UploadFile>) -> String;

    /// Resolves a previously retained token.
    fn resolve(&self, token: &str) -> Result<Arc<dyn UploadFile>, TransferError>;

    /// Releases a token. Unknown tokens are ignored.
    fn release(&self, token: &str);
}

/// A file on the local filesystem.
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

impl LocalFile {
    /// Wraps a path. The file name is the path's final component.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Underlying path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UploadFile for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_in_bytes(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn open_read(&self) -> std::io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// In-memory token registry.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, Arc<dyn UploadFile>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileStore for MemoryStore {
    fn retain(&self, file: Arc<dyn UploadFile>) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.files.lock().unwrap().insert(token.clone(), file);
        token
    }

    fn resolve(&self, token: &str) -> Result<Arc<dyn UploadFile>, TransferError> {
        self.files
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| TransferError::TokenNotFound(token.to_string()))
    }

    fn release(&self, token: &str) {
        self.files.lock().unwrap().remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_resolve_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"JPEG").unwrap();

        let store = MemoryStore::new();
        let token = store.retain(Arc::new(LocalFile::new(&path)));

        let file = store.resolve(&token).unwrap();
        assert_eq!(file.name(), "photo.jpg");
        assert_eq!(file.size_in_bytes().unwrap(), 4);

        store.release(&token);
        assert!(matches!(
            store.resolve(&token),
            Err(TransferError::TokenNotFound(_))
        ));
    }

    #[test]
    fn resolve_unknown_token() {
        let store = MemoryStore::new();
        let err = store.resolve("nope").err().unwrap();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn local_file_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let file = LocalFile::new(&path);
        let mut stream = file.open_read().unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn local_file_missing_metadata_fails() {
        let file = LocalFile::new("/definitely/not/here.bin");
        assert!(file.size_in_bytes().is_err());
    }
}
