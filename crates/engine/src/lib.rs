//! Resumable upload engine.
//!
//! Drives a [`sharelift_transfer::UploadManifest`] against a storage
//! client, file by file, chunk by chunk. The engine owns no UI and no
//! credential handling — the caller supplies an authenticated
//! [`StorageClient`] and a [`sharelift_transfer::FileStore`].
//!
//! # Pipeline
//!
//! 1. **Destination** — create the destination container once, record it
//!    on the manifest
//! 2. **Files** — for each remaining file: open a chunk session, PUT
//!    5 MiB byte ranges until the remote reports the item final
//! 3. **Abort** — on any failure delete the open session (best effort),
//!    roll the manifest back to the start of the file and propagate
//! 4. **Share** — once complete, request a view link for the single
//!    file or the container and store it on the manifest
//!
//! Re-invoking [`UploadEngine::run`] with the same manifest resumes from
//! the first unfinished file.

pub mod engine;
pub mod error;

pub use engine::{StorageClient, UploadEngine};
pub use error::UploadError;
