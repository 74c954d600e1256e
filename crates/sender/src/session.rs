//! Client-side transfer session.
//!
//! One session streams exactly one file over one TLS connection as
//! `Name, Chunk*, Hash`, then half-closes and awaits the receiver's
//! reply. The source file is never touched beyond reading; deletion is
//! the pipeline's decision, gated on a committed reply.

use std::path::Path;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use dropgate_protocol::{StatusCode, UploadFrame, WireError, read_reply, write_frame};
use dropgate_transfer::{ChunkReader, DigestAccumulator, TransferError};

/// Failure of one upload attempt.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("failed to read source file: {0}")]
    Source(#[from] TransferError),

    #[error("receiver rejected upload ({code}): {message}")]
    Rejected { code: StatusCode, message: String },
}

/// Uploads one file over a fresh TLS connection.
pub async fn upload_file(
    connector: &TlsConnector,
    addr: &str,
    server_name: ServerName<'static>,
    path: &Path,
    relative_name: &str,
    chunk_size: usize,
) -> Result<(), UploadError> {
    let tcp = TcpStream::connect(addr).await?;
    let mut stream = connector.connect(server_name, tcp).await?;

    let streamed = stream_file(&mut stream, path, relative_name, chunk_size).await;
    finish(&mut stream, streamed).await
}

/// Emits the frame sequence for one file, folding every chunk into the
/// running digest as it is sent.
pub(crate) async fn stream_file<S>(
    stream: &mut S,
    path: &Path,
    relative_name: &str,
    chunk_size: usize,
) -> Result<(), UploadError>
where
    S: AsyncWrite + Unpin,
{
    // The name always goes first.
    write_frame(stream, &UploadFrame::Name(relative_name.to_string())).await?;

    let mut reader = ChunkReader::open(path, chunk_size).await?;
    let mut digest = DigestAccumulator::new();
    while let Some(chunk) = reader.next_chunk().await? {
        digest.update(&chunk);
        write_frame(stream, &UploadFrame::Chunk(chunk)).await?;
    }

    // The digest always goes last.
    write_frame(stream, &UploadFrame::Hash(digest.finalize_hex())).await?;
    stream.flush().await?;
    Ok(())
}

/// Resolves the session: reads the reply and half-closes.
///
/// After a streaming failure the close-and-read step still runs so a
/// server-side diagnostic can be logged, but the streaming error wins
/// regardless of what it returns.
pub(crate) async fn finish<S>(
    stream: &mut S,
    streamed: Result<(), UploadError>,
) -> Result<(), UploadError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match streamed {
        Ok(()) => {
            let reply = read_reply(stream).await?;
            let _ = stream.shutdown().await;
            if reply.is_ok() {
                Ok(())
            } else {
                Err(UploadError::Rejected {
                    code: reply.code,
                    message: reply.message,
                })
            }
        }
        Err(e) => {
            let _ = stream.shutdown().await;
            if let Ok(reply) = read_reply(stream).await {
                debug!(code = %reply.code, message = %reply.message, "receiver reply after failed stream");
            }
            Err(e)
        }
    }
}
