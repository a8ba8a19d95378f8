//! Wire types for the drive upload API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for creating a folder item.
#[derive(Debug, Clone, Serialize)]
pub struct FolderRequest<'a> {
    pub name: &'a str,
    pub folder: FolderFacet,
}

/// Folder facet; a fresh folder always reports zero children.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    pub child_count: u32,
}

/// Response to `:/createSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionResponse {
    pub upload_url: String,
}

/// Response to `:/createLink`.
#[derive(Debug, Clone, Deserialize)]
pub struct SharePermission {
    pub link: ShareLink,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub web_url: String,
}

/// Outcome of one range PUT against a chunk session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// 202: chunk stored, more ranges expected.
    Accepted,
    /// 200/201: chunk stored and the item is finalized.
    Complete,
}

/// A contiguous byte range of a file, as carried by the `Content-Range`
/// header of a chunk PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte offset of the chunk.
    pub start: u64,
    /// Last byte offset of the chunk (inclusive).
    pub end: u64,
    /// Total file size in bytes.
    pub total: u64,
}

impl ContentRange {
    /// Range for a chunk of `len` bytes starting at `offset` within a file
    /// of `total` bytes. `len` must be non-zero.
    pub fn for_chunk(offset: u64, len: usize, total: u64) -> Self {
        debug_assert!(len > 0, "empty chunks carry no range");
        Self {
            start: offset,
            end: offset + len as u64 - 1,
            total,
        }
    }

    /// Whether this range ends at the last byte of the file.
    pub fn is_final(&self) -> bool {
        self.end + 1 == self.total
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}
