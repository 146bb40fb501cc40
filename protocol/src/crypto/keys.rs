//! # Key Management
//!
//! Private and public keys in the text forms the ledger's tooling speaks:
//!
//! - **WIF** for private keys: `base58(0x80 || secret || checksum)`, where
//!   the checksum is the first four bytes of double-SHA-256 over the
//!   version byte and secret.
//! - **Prefixed base58** for public keys: `<PREFIX>base58(key || checksum)`,
//!   where the checksum is the first four bytes of SHA-256 over the key.
//!   The prefix identifies the network (`MPH`, `STM`, `TST`, ...).
//!
//! The curve behind the keys is Ed25519. Which curve the ledger actually uses
//! is the codec's business; everything above this module only sees
//! [`PrivateKey`], [`PublicKey`] and their string forms.
//!
//! Key bytes are never logged. `Debug` on a private key shows only the
//! public half.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use super::hash::{double_sha256, sha256};
use crate::config::{
    KEY_CHECKSUM_LENGTH, SIGNATURE_LENGTH, SIGNING_KEY_LENGTH, VERIFYING_KEY_LENGTH,
    WIF_VERSION_BYTE,
};

/// Errors that can occur while parsing or encoding keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key is not valid base58")]
    InvalidEncoding,

    #[error("decoded key has wrong length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unexpected WIF version byte 0x{0:02x}")]
    InvalidVersion(u8),

    #[error("key checksum mismatch")]
    ChecksumMismatch,

    #[error("public key must start with prefix {expected}")]
    WrongPrefix { expected: String },

    #[error("bytes are not a valid public key point")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A private signing key.
///
/// Intentionally not `Serialize`: exporting a secret should be a deliberate
/// call to [`PrivateKey::to_wif`].
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a key from raw secret bytes.
    pub fn from_bytes(secret: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Parse a WIF string.
    ///
    /// Rejects anything that is not base58, is not 37 bytes once decoded,
    /// carries the wrong version byte or fails its checksum.
    pub fn from_wif(wif: &str) -> Result<Self, KeyError> {
        let raw = bs58::decode(wif.trim())
            .into_vec()
            .map_err(|_| KeyError::InvalidEncoding)?;

        let expected = 1 + SIGNING_KEY_LENGTH + KEY_CHECKSUM_LENGTH;
        if raw.len() != expected {
            return Err(KeyError::InvalidLength {
                expected,
                actual: raw.len(),
            });
        }

        let (payload, checksum) = raw.split_at(1 + SIGNING_KEY_LENGTH);
        if payload[0] != WIF_VERSION_BYTE {
            return Err(KeyError::InvalidVersion(payload[0]));
        }
        if double_sha256(payload)[..KEY_CHECKSUM_LENGTH] != *checksum {
            return Err(KeyError::ChecksumMismatch);
        }

        let mut secret = [0u8; SIGNING_KEY_LENGTH];
        secret.copy_from_slice(&payload[1..]);
        Ok(Self::from_bytes(&secret))
    }

    /// Encode as WIF.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(1 + SIGNING_KEY_LENGTH + KEY_CHECKSUM_LENGTH);
        payload.push(WIF_VERSION_BYTE);
        payload.extend_from_slice(&self.signing_key.to_bytes());
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..KEY_CHECKSUM_LENGTH]);
        bs58::encode(payload).into_string()
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign an arbitrary message (normally a transaction digest).
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Raw secret bytes. Only the encrypted key store should need this.
    pub fn secret_bytes(&self) -> [u8; SIGNING_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self::from_bytes(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for PrivateKey {
    /// Compared through the public half; secrets are never compared directly.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for PrivateKey {}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A public key. Ordered by raw bytes so key sets iterate deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    bytes: [u8; VERIFYING_KEY_LENGTH],
}

impl PublicKey {
    /// Build from raw bytes, rejecting anything that is not a curve point.
    pub fn from_bytes(bytes: [u8; VERIFYING_KEY_LENGTH]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse `<prefix>base58(key || checksum)`.
    pub fn from_prefixed(s: &str, prefix: &str) -> Result<Self, KeyError> {
        let body = s.strip_prefix(prefix).ok_or_else(|| KeyError::WrongPrefix {
            expected: prefix.to_string(),
        })?;

        let raw = bs58::decode(body)
            .into_vec()
            .map_err(|_| KeyError::InvalidEncoding)?;

        let expected = VERIFYING_KEY_LENGTH + KEY_CHECKSUM_LENGTH;
        if raw.len() != expected {
            return Err(KeyError::InvalidLength {
                expected,
                actual: raw.len(),
            });
        }

        let (key, checksum) = raw.split_at(VERIFYING_KEY_LENGTH);
        if sha256(key)[..KEY_CHECKSUM_LENGTH] != *checksum {
            return Err(KeyError::ChecksumMismatch);
        }

        let mut bytes = [0u8; VERIFYING_KEY_LENGTH];
        bytes.copy_from_slice(key);
        Self::from_bytes(bytes)
    }

    /// Encode as `<prefix>base58(key || checksum)`.
    pub fn to_prefixed(&self, prefix: &str) -> String {
        let mut raw = Vec::with_capacity(VERIFYING_KEY_LENGTH + KEY_CHECKSUM_LENGTH);
        raw.extend_from_slice(&self.bytes);
        raw.extend_from_slice(&sha256(&self.bytes)[..KEY_CHECKSUM_LENGTH]);
        format!("{}{}", prefix, bs58::encode(raw).into_string())
    }

    pub fn as_bytes(&self) -> &[u8; VERIFYING_KEY_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Check a signature produced by [`PrivateKey::sign`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
            return false;
        };
        verifying_key
            .verify(message, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}
