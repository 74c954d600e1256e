//! Test certificate authority.
//!
//! Mints a CA plus CA-signed certificates for test parties, written as
//! PEM triples the way the binaries would load them from disk.

use std::path::Path;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
};

use dropgate_identity::TlsPaths;

pub struct TestCa {
    cert: Certificate,
    key: KeyPair,
}

impl TestCa {
    pub fn new() -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "dropgate test CA");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    /// Issues a certificate for `cn` (SAN `localhost`) and writes the
    /// PEM triple into `dir`.
    pub fn issue(&self, dir: &Path, cn: &str) -> TlsPaths {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, cn);
        params.distinguished_name = dn;
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();

        let paths = TlsPaths {
            certificate: dir.join(format!("{cn}.crt")),
            key: dir.join(format!("{cn}.key")),
            cert_authority: dir.join("ca.crt"),
        };
        std::fs::write(&paths.certificate, cert.pem()).unwrap();
        std::fs::write(&paths.key, key.serialize_pem()).unwrap();
        std::fs::write(&paths.cert_authority, self.cert.pem()).unwrap();
        paths
    }
}
