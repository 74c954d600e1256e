//! Server-side transfer session.
//!
//! One session consumes the frame sequence `Name, Chunk*, Hash` and ends
//! in exactly one of commit or discard. Chunk bytes go straight to the
//! destination file while the digest accumulates alongside; the payload
//! is never buffered whole. The [`StagingFile`] guard makes discard the
//! default on every exit path; commit is the only way to keep bytes.

use tokio::io::AsyncRead;
use tracing::{debug, error, warn};

use dropgate_protocol::{Reply, UploadFrame, read_frame};
use dropgate_transfer::DigestAccumulator;

use crate::storage::{StagingFile, StorageLayout};

/// Runs one upload session over `stream`, returning the terminal reply.
///
/// Every failure is mapped to a structured status code; nothing here is
/// fatal to the server. The caller writes the reply back.
pub async fn receive_file<S>(stream: &mut S, identity: &str, layout: &StorageLayout) -> Reply
where
    S: AsyncRead + Unpin,
{
    debug!(identity, "upload session started");

    // AwaitName: the first frame must carry the relative name.
    let name = match read_frame(stream).await {
        Ok(UploadFrame::Name(name)) => name,
        Ok(frame) => {
            warn!(identity, frame = frame.kind(), "first frame is not a name");
            return Reply::invalid_argument(format!(
                "expected name frame first, got {} frame",
                frame.kind()
            ));
        }
        Err(e) => {
            warn!(identity, "failed to receive name frame: {e}");
            return Reply::invalid_argument(format!("failed to receive name frame: {e}"));
        }
    };

    let dest = match layout.dest_path(identity, &name) {
        Ok(dest) => dest,
        Err(e) => {
            warn!(identity, file = %name, "rejected upload name: {e}");
            return Reply::invalid_argument(e.to_string());
        }
    };

    let mut staging = match StagingFile::create(dest).await {
        Ok(staging) => staging,
        Err(e) => {
            error!(identity, file = %name, "failed to open destination: {e}");
            return Reply::internal(format!("failed to open destination: {e}"));
        }
    };

    // Streaming until the hash frame resolves the session.
    let mut digest = DigestAccumulator::new();
    loop {
        match read_frame(stream).await {
            Ok(UploadFrame::Chunk(bytes)) => {
                digest.update(&bytes);
                if let Err(e) = staging.write(&bytes).await {
                    error!(identity, file = %name, "failed to write chunk: {e}");
                    staging.discard().await;
                    return Reply::internal(format!("failed to write chunk: {e}"));
                }
            }
            Ok(UploadFrame::Hash(sent)) => {
                // AwaitHash: byte-for-byte comparison of the hex digests.
                let computed = digest.finalize_hex();
                if computed != sent {
                    warn!(identity, file = %name, "digest mismatch, discarding");
                    staging.discard().await;
                    return Reply::data_loss("digest mismatch");
                }
                return match staging.commit().await {
                    Ok(()) => {
                        debug!(identity, file = %name, "file committed");
                        Reply::ok()
                    }
                    Err(e) => {
                        error!(identity, file = %name, "failed to commit: {e}");
                        Reply::internal(format!("failed to commit: {e}"))
                    }
                };
            }
            Ok(UploadFrame::Name(_)) => {
                warn!(identity, file = %name, "unexpected second name frame");
                staging.discard().await;
                return Reply::invalid_argument("unexpected second name frame");
            }
            Err(e) => {
                warn!(identity, file = %name, "failed to receive frame: {e}");
                staging.discard().await;
                return Reply::invalid_argument(format!("failed to receive frame: {e}"));
            }
        }
    }
}
