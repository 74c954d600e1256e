//! Building blocks shared by the dropgate sender and receiver: the
//! incremental content digest, the chunked file reader the sender streams
//! from, and relative-path validation.

mod chunked;
mod digest;
mod validation;

pub use chunked::ChunkReader;
pub use digest::{DigestAccumulator, digest_bytes};
pub use validation::validate_relative_path;

/// Default chunk size: 32 KiB.
///
/// Small enough to bound per-frame latency, large enough to keep framing
/// overhead negligible. The sender may override it per configuration.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Errors produced by the transfer primitives.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
