//! HTTP client for the drive upload API.
//!
//! Speaks one protocol dialect: folder creation under `/drive/root`,
//! chunked upload sessions (`:/createSession`, range PUTs, DELETE to
//! abort) and share-link creation (`:/createLink`). Authentication is a
//! bearer token obtained from an opaque [`TokenProvider`].

pub mod client;
pub mod types;

pub use client::{DriveClient, Error, FolderStatus, StaticToken, TokenProvider};
pub use types::{ContentRange, RangeStatus};
