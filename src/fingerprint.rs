//! Content fingerprints for loaded documents
//!
//! A fingerprint is a short, deterministic identifier derived from the raw
//! document bytes. It namespaces the per-document annotation entry in durable
//! storage, so the same file always finds its annotations again.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of every fingerprint string
pub const FINGERPRINT_LEN: usize = 16;

/// Number of leading bytes the fallback scheme looks at
const FALLBACK_PREFIX_BYTES: usize = 100;

/// How a fingerprint was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMethod {
    /// Truncated SHA-256 digest
    Digest,
    /// Byte length followed by the hex of the first bytes. Collisions between
    /// distinct documents are possible.
    Fallback,
}

/// Stable identifier for a document's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the bytes with the digest scheme
    pub fn compute(bytes: &[u8]) -> Self {
        Self::compute_with(bytes, FingerprintMethod::Digest)
    }

    /// Fingerprint the bytes with an explicit scheme
    pub fn compute_with(bytes: &[u8], method: FingerprintMethod) -> Self {
        match method {
            FingerprintMethod::Digest => Self::digest(bytes),
            FingerprintMethod::Fallback => Self::fallback(bytes),
        }
    }

    /// First 16 hex characters of the SHA-256 digest
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let mut encoded = hex::encode(hasher.finalize());
        encoded.truncate(FINGERPRINT_LEN);
        Self(encoded)
    }

    /// Decimal byte length, then each of the first 100 bytes in unpadded
    /// lowercase hex, truncated to 16 characters.
    pub fn fallback(bytes: &[u8]) -> Self {
        let mut encoded = bytes.len().to_string();
        for byte in bytes.iter().take(FALLBACK_PREFIX_BYTES) {
            encoded.push_str(&format!("{:x}", byte));
        }
        encoded.truncate(FINGERPRINT_LEN);
        Self(encoded)
    }

    /// Wrap an already-computed fingerprint string
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Durable storage key for this document's annotation map
    pub fn storage_key(&self) -> String {
        format!("pdf-annotations-{}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
