//! # AES-256-GCM Encryption
//!
//! Authenticated encryption for secrets at rest. The encrypted key store
//! seals every private key with [`encrypt_with_aad`], binding the owning
//! public key as associated data so a sealed blob cannot be swapped onto a
//! different key entry.
//!
//! ## Nonce management
//!
//! Random 96-bit nonces from `OsRng`. Never reuse a (key, nonce) pair.
//!
//! ## Wire format
//!
//! [`encrypt`] returns `nonce || ciphertext` as a single `Vec<u8>`;
//! [`decrypt`] expects the same.
//!
//! ## Passphrases
//!
//! [`derive_key`] stretches a passphrase into an AES key with Argon2id
//! (default parameters) and a caller-supplied salt.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, KDF_SALT_LENGTH};

/// Errors that can occur during encryption, decryption or key derivation.
///
/// Kept deliberately vague: "wrong key" and "corrupted ciphertext" are the
/// same error to anyone reading it.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {AES_NONCE_LENGTH} bytes")]
    CiphertextTooShort,

    #[error("key derivation failed")]
    KeyDerivationFailed,
}

/// Encrypt plaintext with AES-256-GCM using a random nonce.
///
/// ```
/// use quill_protocol::crypto::encryption::{encrypt, decrypt};
///
/// let key = [0x42u8; 32];
/// let sealed = encrypt(&key, b"secret").unwrap();
/// assert_eq!(decrypt(&key, &sealed).unwrap(), b"secret");
/// ```
pub fn encrypt(key: &[u8; AES_KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    encrypt_with_aad(key, plaintext, b"")
}

/// Decrypt data previously encrypted with [`encrypt`].
pub fn decrypt(key: &[u8; AES_KEY_LENGTH], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    decrypt_with_aad(key, data, b"")
}

/// Encrypt with Additional Authenticated Data.
///
/// The AAD is authenticated but not encrypted, and must be supplied again
/// at decryption time. Output layout matches [`encrypt`].
pub fn encrypt_with_aad(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt `nonce || ciphertext` produced by [`encrypt_with_aad`].
pub fn decrypt_with_aad(
    key: &[u8; AES_KEY_LENGTH],
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if data.len() < AES_NONCE_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = data.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::DecryptFailed)
}

/// Fresh random salt for [`derive_key`].
pub fn random_salt() -> [u8; KDF_SALT_LENGTH] {
    let mut salt = [0u8; KDF_SALT_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Stretch a passphrase into an AES-256 key with Argon2id.
pub fn derive_key(
    passphrase: &str,
    salt: &[u8; KDF_SALT_LENGTH],
) -> Result<[u8; AES_KEY_LENGTH], EncryptionError> {
    let mut key = [0u8; AES_KEY_LENGTH];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|_| EncryptionError::KeyDerivationFailed)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let sealed = encrypt(&key, b"the quick brown fox").unwrap();
        assert_eq!(decrypt(&key, &sealed).unwrap(), b"the quick brown fox");
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let key = test_key();
        let sealed = encrypt(&key, b"secret").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;
        assert!(decrypt(&wrong_key, &sealed).is_err());
    }

    #[test]
    fn test_modified_ciphertext_fails_decryption() {
        let key = test_key();
        let mut sealed = encrypt(&key, b"secret").unwrap();
        sealed[AES_NONCE_LENGTH] ^= 0xFF;
        assert!(decrypt(&key, &sealed).is_err());
    }

    #[test]
    fn test_wrong_aad_fails_decryption() {
        let key = test_key();
        let sealed = encrypt_with_aad(&key, b"secret", b"MPHkey-a").unwrap();
        assert!(decrypt_with_aad(&key, &sealed, b"MPHkey-b").is_err());
        assert_eq!(
            decrypt_with_aad(&key, &sealed, b"MPHkey-a").unwrap(),
            b"secret"
        );
    }

    #[test]
    fn test_decrypt_too_short() {
        let key = test_key();
        assert!(matches!(
            decrypt(&key, &[0u8; 4]),
            Err(EncryptionError::CiphertextTooShort)
        ));
    }

    #[test]
    fn derive_key_is_deterministic_per_salt() {
        let salt = [7u8; KDF_SALT_LENGTH];
        let a = derive_key("correct horse", &salt).unwrap();
        let b = derive_key("correct horse", &salt).unwrap();
        let c = derive_key("battery staple", &salt).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn derive_key_depends_on_salt() {
        let a = derive_key("pw", &[1u8; KDF_SALT_LENGTH]).unwrap();
        let b = derive_key("pw", &[2u8; KDF_SALT_LENGTH]).unwrap();
        assert_ne!(a, b);
    }
}
