//! Sender identity for dropgate connections.
//!
//! The transfer channel is mutually-authenticated TLS; a sender's
//! identity is the subject common name of its verified client
//! certificate. This crate loads the PEM triple (certificate, key, trust
//! anchor) into rustls configurations, extracts the peer common name from
//! a live connection's certificate chain, and enforces the receiver's
//! allow-list.

mod gate;
mod peer;
mod tls;

pub use gate::{GateError, IdentityGate};
pub use peer::peer_common_name;
pub use tls::{TlsPaths, client_config, server_config};

use std::path::PathBuf;

/// Errors loading TLS material or building a TLS configuration.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no certificate found in {}", .0.display())]
    NoCertificate(PathBuf),

    #[error("no private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("no usable trust anchor in {}", .0.display())]
    EmptyTrustAnchor(PathBuf),

    #[error("client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    #[error("TLS configuration: {0}")]
    Tls(#[from] rustls::Error),
}
