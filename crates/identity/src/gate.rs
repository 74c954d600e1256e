//! The allow-list gate applied to every incoming session.

use std::collections::HashSet;

use rustls::pki_types::CertificateDer;
use tracing::warn;

use crate::peer::peer_common_name;

/// Authorization failure for one session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    #[error("no verified peer identity")]
    MissingIdentity,

    #[error("identity {0:?} is not allowed")]
    NotAllowed(String),
}

/// Membership check over the configured sender allow-list.
///
/// Built once at startup and never mutated. `authorize` is a pure
/// predicate: it is evaluated independently for every session, from the
/// live connection's certificate chain, and fails closed when no
/// verified identity is present.
#[derive(Debug, Clone)]
pub struct IdentityGate {
    allowed: HashSet<String>,
}

impl IdentityGate {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: names.into_iter().collect(),
        }
    }

    /// Authorizes one session and returns the verified identity.
    pub fn authorize(
        &self,
        peer_certs: Option<&[CertificateDer<'_>]>,
    ) -> Result<String, GateError> {
        let certs = peer_certs.ok_or(GateError::MissingIdentity)?;
        let name = peer_common_name(certs).ok_or(GateError::MissingIdentity)?;

        if self.allowed.contains(&name) {
            Ok(name)
        } else {
            warn!(identity = %name, "rejecting sender not on the allow-list");
            Err(GateError::NotAllowed(name))
        }
    }

    /// Membership test without a certificate chain (used by diagnostics).
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }
}
