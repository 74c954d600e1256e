//! Peer identity extraction from a verified certificate chain.

use rustls::pki_types::CertificateDer;
use x509_parser::prelude::*;

/// Returns the subject common name of the leaf certificate.
///
/// `None` when the chain is empty, the leaf does not parse, or its
/// subject carries no CN — callers treat all three as "no identity".
pub fn peer_common_name(certs: &[CertificateDer<'_>]) -> Option<String> {
    let leaf = certs.first()?;
    let (_, parsed) = X509Certificate::from_der(leaf.as_ref()).ok()?;
    parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}
