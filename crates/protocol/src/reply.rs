//! The receiver's terminal reply.
//!
//! # Wire format
//!
//! ```text
//! REPLY (receiver -> sender): [1 byte: status] [2 bytes BE: len] [len bytes: UTF-8 message]
//! ```
//!
//! Exactly one reply ends every session, success or not.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::WireError;

/// Outcome of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    /// File verified and committed.
    Ok = 0,
    /// Malformed frame sequence, bad name, or transport error.
    InvalidArgument = 1,
    /// Digest mismatch between sent and received content.
    DataLoss = 2,
    /// Local storage failure on the receiver.
    Internal = 3,
    /// Identity missing or not on the allow-list.
    Unauthenticated = 4,
}

impl StatusCode {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(StatusCode::Ok),
            1 => Some(StatusCode::InvalidArgument),
            2 => Some(StatusCode::DataLoss),
            3 => Some(StatusCode::Internal),
            4 => Some(StatusCode::Unauthenticated),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::InvalidArgument => "invalid argument",
            StatusCode::DataLoss => "data loss",
            StatusCode::Internal => "internal",
            StatusCode::Unauthenticated => "unauthenticated",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured session outcome sent back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: StatusCode,
    pub message: String,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::InvalidArgument,
            message: message.into(),
        }
    }

    pub fn data_loss(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::DataLoss,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Internal,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Unauthenticated,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

/// Writes the reply and flushes the stream.
pub async fn write_reply<W: AsyncWrite + Unpin>(
    writer: &mut W,
    reply: &Reply,
) -> Result<(), WireError> {
    let msg = reply.message.as_bytes();
    if msg.len() > u16::MAX as usize {
        return Err(WireError::Protocol(format!(
            "reply message too long: {} bytes",
            msg.len()
        )));
    }

    writer.write_u8(reply.code as u8).await?;
    writer.write_u16(msg.len() as u16).await?;
    writer.write_all(msg).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the reply from the stream.
pub async fn read_reply<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Reply, WireError> {
    let code = reader.read_u8().await?;
    let code = StatusCode::from_u8(code)
        .ok_or_else(|| WireError::Protocol(format!("unknown status code {code}")))?;

    let len = reader.read_u16().await? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    let message = String::from_utf8(buf)
        .map_err(|e| WireError::Protocol(format!("reply message is not valid UTF-8: {e}")))?;

    Ok(Reply { code, message })
}
