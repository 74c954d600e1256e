//! Incremental SHA-256 content digests.
//!
//! Both sides fold chunk payloads into an accumulator as they stream, so
//! the digest never requires the whole file in memory. The hex encoding
//! is lowercase on both ends; comparison is an exact byte match.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 of `data` and returns the lowercase hex digest.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Running SHA-256 over a stream of chunk payloads.
#[derive(Default)]
pub struct DigestAccumulator {
    hasher: Sha256,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one chunk's bytes into the digest.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Finalizes the digest as lowercase hex.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
