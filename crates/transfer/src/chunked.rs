//! Fixed-size chunking of a sequential read stream.

use std::io::Read;

use crate::{CHUNK_SIZE, TransferError};

/// A chunk of file data ready for one range PUT.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Byte offset within the file.
    pub offset: u64,
    /// Size of this chunk in bytes.
    pub size: usize,
    /// Raw chunk data.
    pub data: Vec<u8>,
}

/// Reads a sequential stream in fixed-size chunks.
///
/// There is no seeking: resume after a failed upload restarts the file
/// from byte 0, so streams are always consumed front to back.
pub struct ChunkReader {
    stream: Box<dyn Read + Send>,
    chunk_size: usize,
    offset: u64,
    total_size: u64,
}

impl ChunkReader {
    /// Wraps `stream` with a known total length.
    ///
    /// If `chunk_size` is 0, [`CHUNK_SIZE`] (5 MiB) is used.
    pub fn new(stream: Box<dyn Read + Send>, total_size: u64, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 { CHUNK_SIZE } else { chunk_size };
        Self {
            stream,
            chunk_size,
            offset: 0,
            total_size,
        }
    }

    /// Reads the next chunk. Returns `None` once `total_size` bytes have
    /// been consumed or the stream ends early.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.total_size.saturating_sub(self.offset);
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        let mut filled = 0;
        while filled < read_size {
            let n = self.stream.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let chunk = Chunk {
            offset: self.offset,
            size: filled,
            data: buf,
        };
        self.offset += filled as u64;
        Ok(Some(chunk))
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.offset)
    }
}
