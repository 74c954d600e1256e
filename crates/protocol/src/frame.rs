//! Upload frames and their binary encoding.
//!
//! # Wire format
//!
//! ```text
//! FRAME (sender -> receiver): [1 byte: tag] [4 bytes BE: len] [len bytes: payload]
//!
//!   0x01 Name  - UTF-8 relative path, no leading separator
//!   0x02 Chunk - raw file bytes
//!   0x03 Hash  - 64 bytes lowercase hex SHA-256 of all chunk payloads
//! ```
//!
//! A session's frame sequence is exactly `Name, Chunk*, Hash`. The codec
//! enforces per-frame well-formedness; sequence order is enforced by the
//! receiving session.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::WireError;

/// Frame tag: relative file name.
pub const TAG_NAME: u8 = 0x01;

/// Frame tag: file data chunk.
pub const TAG_CHUNK: u8 = 0x02;

/// Frame tag: trailing content digest.
pub const TAG_HASH: u8 = 0x03;

/// Maximum encoded length of a relative name.
pub const MAX_NAME_LEN: usize = 4096;

/// Maximum payload length of a single chunk frame.
pub const MAX_CHUNK_LEN: usize = 8 * 1024 * 1024;

/// Exact payload length of a hash frame (SHA-256 as lowercase hex).
pub const HASH_HEX_LEN: usize = 64;

/// One message within an upload session.
///
/// A closed set: a frame carries exactly one of the three payloads, and
/// decoding rejects any tag outside the set as a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFrame {
    /// Relative path of the file, always first in a session.
    Name(String),
    /// A run of file bytes; zero or more per session, final one may be short.
    Chunk(Vec<u8>),
    /// Hex digest over all chunk payloads in send order, always last.
    Hash(String),
}

impl UploadFrame {
    /// Wire tag for this frame.
    pub fn tag(&self) -> u8 {
        match self {
            UploadFrame::Name(_) => TAG_NAME,
            UploadFrame::Chunk(_) => TAG_CHUNK,
            UploadFrame::Hash(_) => TAG_HASH,
        }
    }

    /// Variant name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadFrame::Name(_) => "name",
            UploadFrame::Chunk(_) => "chunk",
            UploadFrame::Hash(_) => "hash",
        }
    }
}

/// Writes one frame to the stream.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &UploadFrame,
) -> Result<(), WireError> {
    let payload: &[u8] = match frame {
        UploadFrame::Name(name) => {
            if name.is_empty() || name.len() > MAX_NAME_LEN {
                return Err(WireError::Protocol(format!(
                    "name length {} out of range (1..={MAX_NAME_LEN})",
                    name.len()
                )));
            }
            name.as_bytes()
        }
        UploadFrame::Chunk(data) => {
            if data.len() > MAX_CHUNK_LEN {
                return Err(WireError::Protocol(format!(
                    "chunk length {} exceeds maximum {MAX_CHUNK_LEN}",
                    data.len()
                )));
            }
            data
        }
        UploadFrame::Hash(hex) => {
            validate_hash_payload(hex.as_bytes())?;
            hex.as_bytes()
        }
    };

    writer.write_u8(frame.tag()).await?;
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    Ok(())
}

/// Reads one frame from the stream.
///
/// Unknown tags, out-of-range lengths, and malformed payloads are
/// protocol violations, not silently skipped.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<UploadFrame, WireError> {
    let tag = reader.read_u8().await?;
    let len = reader.read_u32().await? as usize;

    match tag {
        TAG_NAME => {
            if len == 0 || len > MAX_NAME_LEN {
                return Err(WireError::Protocol(format!(
                    "name length {len} out of range (1..={MAX_NAME_LEN})"
                )));
            }
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            let name = String::from_utf8(buf)
                .map_err(|e| WireError::Protocol(format!("name is not valid UTF-8: {e}")))?;
            Ok(UploadFrame::Name(name))
        }
        TAG_CHUNK => {
            if len > MAX_CHUNK_LEN {
                return Err(WireError::Protocol(format!(
                    "chunk length {len} exceeds maximum {MAX_CHUNK_LEN}"
                )));
            }
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            Ok(UploadFrame::Chunk(buf))
        }
        TAG_HASH => {
            if len != HASH_HEX_LEN {
                return Err(WireError::Protocol(format!(
                    "hash length {len}, expected {HASH_HEX_LEN}"
                )));
            }
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            validate_hash_payload(&buf)?;
            let hash = String::from_utf8(buf)
                .map_err(|e| WireError::Protocol(format!("hash is not valid UTF-8: {e}")))?;
            Ok(UploadFrame::Hash(hash))
        }
        other => Err(WireError::Protocol(format!(
            "unknown frame tag {other:#04x}"
        ))),
    }
}

fn validate_hash_payload(bytes: &[u8]) -> Result<(), WireError> {
    if bytes.len() != HASH_HEX_LEN {
        return Err(WireError::Protocol(format!(
            "hash length {}, expected {HASH_HEX_LEN}",
            bytes.len()
        )));
    }
    if !bytes
        .iter()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
    {
        return Err(WireError::Protocol(
            "hash is not lowercase hex".into(),
        ));
    }
    Ok(())
}
