//! Loads the PEM triple into rustls configurations.
//!
//! The receiver requires and verifies a client certificate against the
//! trust anchor; the sender verifies the receiver against the same
//! anchor and presents its own certificate. Nothing here negotiates TLS
//! itself; the configurations are handed to `tokio-rustls`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::TlsError;

/// Paths to this party's certificate, private key, and trust anchor.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub certificate: PathBuf,
    pub key: PathBuf,
    pub cert_authority: PathBuf,
}

/// Builds the receiver-side TLS configuration.
///
/// Client certificates are required and verified against the trust
/// anchor; a handshake without one fails before any application data.
pub fn server_config(paths: &TlsPaths) -> Result<ServerConfig, TlsError> {
    let roots = root_store(&paths.cert_authority)?;
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots)).build()?;

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(
            load_certs(&paths.certificate)?,
            load_key(&paths.key)?,
        )?;
    Ok(config)
}

/// Builds the sender-side TLS configuration.
pub fn client_config(paths: &TlsPaths) -> Result<ClientConfig, TlsError> {
    let roots = root_store(&paths.cert_authority)?;

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(
            load_certs(&paths.certificate)?,
            load_key(&paths.key)?,
        )?;
    Ok(config)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn root_store(path: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    if roots.is_empty() {
        return Err(TlsError::EmptyTrustAnchor(path.to_path_buf()));
    }
    Ok(roots)
}
