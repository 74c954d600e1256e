//! The dropgate sending agent.
//!
//! Watches a monitored folder, streams every discovered file to the
//! receiver over mutually-authenticated TLS, and deletes the local copy
//! once the receiver acknowledges a verified commit. Failed uploads are
//! released for rediscovery on the next poll; nothing per-file is ever
//! fatal to the pipeline.

pub mod pipeline;
mod scanner;
pub mod session;

pub use pipeline::{Sender, SenderConfig};
pub use session::UploadError;

use std::path::PathBuf;

/// Fatal sender startup errors. Everything after startup is per-file.
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("monitored folder {} does not exist", .0.display())]
    MonitorFolder(PathBuf),

    #[error("invalid receiver host {0:?}")]
    BadHost(String),

    #[error("TLS error: {0}")]
    Tls(#[from] dropgate_identity::TlsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
