//! The dropgate receiving agent.
//!
//! Accepts mutually-authenticated TLS connections, authorizes each
//! session against the sender allow-list before reading a single frame,
//! streams the uploaded file straight to its destination under
//! `storageRoot/<identity>/`, verifies the trailing digest, and commits
//! or discards atomically.

pub mod server;
pub mod session;
pub mod storage;

pub use server::{Receiver, ReceiverConfig};
pub use storage::{StagingFile, StorageLayout};

/// Errors produced by the receiving agent.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] dropgate_identity::TlsError),

    #[error("wire error: {0}")]
    Wire(#[from] dropgate_protocol::WireError),
}
