//! Content hashing.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `text` (64 lowercase hex characters).
#[must_use]
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
