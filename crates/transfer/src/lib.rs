//! Upload manifest, chunked file reading and progress notification.
//!
//! Everything in this crate is local state: no network I/O happens here.
//! The manifest records how far a multi-file upload has progressed and
//! round-trips through JSON so an interrupted upload can resume after a
//! process restart.

mod chunked;
mod manifest;
mod store;

pub use chunked::{Chunk, ChunkReader};
pub use manifest::{ProgressListener, UploadManifest};
pub use store::{FileStore, LocalFile, MemoryStore, UploadFile};

/// Default chunk size: 5 MiB.
///
/// The upload service accepts byte ranges of at most this size per PUT;
/// the last chunk of a file may be smaller.
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file token not found: {0}")]
    TokenNotFound(String),
}
