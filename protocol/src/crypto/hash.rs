//! # Hashing Utilities
//!
//! SHA-256 and its doubled form. Key checksums, WIF checksums, signature
//! digests and transaction ids all go through here so there is exactly one
//! place that decides what "the hash" is.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use quill_protocol::crypto::sha256;
///
/// let hash = sha256(b"quill");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 over several byte slices without concatenating them first.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Compute `SHA-256(SHA-256(data))`.
///
/// Used for WIF checksums, where the doubled construction is what every
/// wallet in the ecosystem expects.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}
