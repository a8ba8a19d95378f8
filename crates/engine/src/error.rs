//! Upload error types.

use sharelift_transfer::TransferError;

/// Errors produced while driving an upload.
///
/// Nothing is retried internally; every variant leaves the manifest
/// consistent and resumable at the start of the failed file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote error {status}: {detail}")]
    Remote { status: u16, detail: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("cancelled")]
    Cancelled,

    #[error("upload failed: {0}")]
    Upload(String),
}

impl From<sharelift_client::Error> for UploadError {
    fn from(e: sharelift_client::Error) -> Self {
        match e {
            sharelift_client::Error::Api { status, body } => Self::Remote {
                status,
                detail: body,
            },
            sharelift_client::Error::Http(e) => Self::Transport(e.to_string()),
            sharelift_client::Error::Json(e) => Self::Json(e),
            sharelift_client::Error::InvalidToken => Self::Upload("invalid access token".into()),
        }
    }
}
