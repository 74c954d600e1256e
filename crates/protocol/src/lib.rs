//! Wire protocol for dropgate file transfers.
//!
//! One upload session carries exactly one file as a fixed frame sequence
//! `Name, Chunk*, Hash` from sender to receiver, answered by a single
//! [`Reply`] from receiver to sender. See [`frame`] and [`reply`] for the
//! binary layout.

pub mod frame;
pub mod reply;

pub use frame::{UploadFrame, read_frame, write_frame};
pub use reply::{Reply, StatusCode, read_reply, write_reply};

/// Errors produced by the wire codec.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}
