//! Fixed-size chunked reads from a source file.

use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Reads a file as a sequence of fixed-size chunks.
///
/// Every chunk is `chunk_size` bytes except the last, which carries
/// whatever remains; an empty file yields no chunks at all.
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// A `chunk_size` of 0 selects [`DEFAULT_CHUNK_SIZE`].
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = File::open(path).await?;
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self { file, chunk_size })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransferError> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        // Fill the buffer so chunks stay fixed-size until EOF.
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}
