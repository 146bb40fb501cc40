//! Passphrase-protected key store.
//!
//! Every secret is sealed with AES-256-GCM under a key stretched from the
//! passphrase with Argon2id; the owning public key is bound as associated
//! data. Locking drops the derived key from memory, after which every
//! lookup fails with [`KeyStoreError::Locked`] until [`EncryptedKeyStore::unlock`]
//! succeeds again.
//!
//! A sealed verifier blob lets `unlock` tell a wrong passphrase apart from a
//! missing key. The whole store can be exported to (and imported from) a
//! [`SealedWallet`], which contains no plaintext secrets.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keystore::{KeyStore, KeyStoreError};
use crate::config::{AES_KEY_LENGTH, KDF_SALT_LENGTH, SIGNING_KEY_LENGTH};
use crate::crypto::encryption::{
    decrypt, decrypt_with_aad, derive_key, encrypt, encrypt_with_aad, random_salt,
    EncryptionError,
};
use crate::crypto::keys::{KeyError, PrivateKey, PublicKey};

const VERIFIER_PLAINTEXT: &[u8] = b"quill-keystore-v1";

/// Serializable form of an [`EncryptedKeyStore`]. All fields are hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedWallet {
    pub salt: String,
    pub verifier: String,
    /// Public key (hex) to sealed secret (hex).
    pub keys: BTreeMap<String, String>,
}

pub struct EncryptedKeyStore {
    salt: [u8; KDF_SALT_LENGTH],
    verifier: Vec<u8>,
    sealed: RwLock<BTreeMap<PublicKey, Vec<u8>>>,
    unlocked: RwLock<Option<[u8; AES_KEY_LENGTH]>>,
}

impl EncryptedKeyStore {
    /// Create an empty store protected by `passphrase`. Starts unlocked.
    pub fn create(passphrase: &str) -> Result<Self, KeyStoreError> {
        let salt = random_salt();
        let key = derive_key(passphrase, &salt)?;
        let verifier = encrypt(&key, VERIFIER_PLAINTEXT)?;
        Ok(Self {
            salt,
            verifier,
            sealed: RwLock::new(BTreeMap::new()),
            unlocked: RwLock::new(Some(key)),
        })
    }

    /// Rebuild a store from its exported form. Starts locked.
    pub fn import(wallet: &SealedWallet) -> Result<Self, KeyStoreError> {
        let salt_bytes = decode_hex(&wallet.salt)?;
        let salt: [u8; KDF_SALT_LENGTH] = salt_bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::Encryption(EncryptionError::DecryptFailed))?;

        let mut sealed = BTreeMap::new();
        for (pk_hex, blob_hex) in &wallet.keys {
            let pk_bytes: [u8; 32] = decode_hex(pk_hex)?
                .as_slice()
                .try_into()
                .map_err(|_| KeyStoreError::InvalidKey(KeyError::InvalidPublicKey))?;
            sealed.insert(PublicKey::from_bytes(pk_bytes)?, decode_hex(blob_hex)?);
        }

        Ok(Self {
            salt,
            verifier: decode_hex(&wallet.verifier)?,
            sealed: RwLock::new(sealed),
            unlocked: RwLock::new(None),
        })
    }

    /// Export without plaintext secrets. Works while locked.
    pub fn export(&self) -> SealedWallet {
        SealedWallet {
            salt: hex::encode(self.salt),
            verifier: hex::encode(&self.verifier),
            keys: self
                .sealed
                .read()
                .iter()
                .map(|(pk, blob)| (pk.to_hex(), hex::encode(blob)))
                .collect(),
        }
    }

    pub fn lock(&self) {
        *self.unlocked.write() = None;
        debug!("key store locked");
    }

    pub fn unlock(&self, passphrase: &str) -> Result<(), KeyStoreError> {
        let key = derive_key(passphrase, &self.salt)?;
        decrypt(&key, &self.verifier).map_err(|_| KeyStoreError::WrongPassphrase)?;
        *self.unlocked.write() = Some(key);
        debug!("key store unlocked");
        Ok(())
    }

    /// Seal and store a private key. Requires the store to be unlocked.
    pub fn add_key(&self, key: &PrivateKey) -> Result<PublicKey, KeyStoreError> {
        let aes_key = (*self.unlocked.read()).ok_or(KeyStoreError::Locked)?;
        let public_key = key.public_key();
        let blob = encrypt_with_aad(&aes_key, &key.secret_bytes(), public_key.as_bytes())?;
        self.sealed.write().insert(public_key, blob);
        Ok(public_key)
    }

    pub fn len(&self) -> usize {
        self.sealed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sealed.read().is_empty()
    }
}

impl KeyStore for EncryptedKeyStore {
    fn get_private_key(&self, public_key: &PublicKey) -> Result<PrivateKey, KeyStoreError> {
        let aes_key = (*self.unlocked.read()).ok_or(KeyStoreError::Locked)?;
        let sealed = self.sealed.read();
        let blob = sealed
            .get(public_key)
            .ok_or_else(|| KeyStoreError::MissingKey {
                public_key: public_key.to_hex(),
            })?;

        let secret = decrypt_with_aad(&aes_key, blob, public_key.as_bytes())?;
        let secret: [u8; SIGNING_KEY_LENGTH] = secret
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::Encryption(EncryptionError::DecryptFailed))?;
        Ok(PrivateKey::from_bytes(&secret))
    }

    fn is_locked(&self) -> bool {
        self.unlocked.read().is_none()
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, KeyStoreError> {
    hex::decode(s).map_err(|_| KeyStoreError::InvalidKey(KeyError::InvalidEncoding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_returns_keys_while_unlocked() {
        let store = EncryptedKeyStore::create("hunter2").unwrap();
        let key = PrivateKey::generate();
        let pk = store.add_key(&key).unwrap();

        assert!(!store.is_locked());
        assert_eq!(store.get_private_key(&pk).unwrap(), key);
    }

    #[test]
    fn locked_store_refuses_lookups_and_inserts() {
        let store = EncryptedKeyStore::create("hunter2").unwrap();
        let key = PrivateKey::generate();
        let pk = store.add_key(&key).unwrap();

        store.lock();
        assert!(store.is_locked());
        assert!(matches!(
            store.get_private_key(&pk),
            Err(KeyStoreError::Locked)
        ));
        assert!(matches!(store.add_key(&key), Err(KeyStoreError::Locked)));
    }

    #[test]
    fn unlock_checks_passphrase() {
        let store = EncryptedKeyStore::create("hunter2").unwrap();
        store.lock();
        assert!(matches!(
            store.unlock("hunter3"),
            Err(KeyStoreError::WrongPassphrase)
        ));
        assert!(store.is_locked());
        store.unlock("hunter2").unwrap();
        assert!(!store.is_locked());
    }

    #[test]
    fn export_import_keeps_keys_sealed() {
        let store = EncryptedKeyStore::create("pw").unwrap();
        let key = PrivateKey::generate();
        let pk = store.add_key(&key).unwrap();

        let exported = store.export();
        let json = serde_json::to_string(&exported).unwrap();
        assert!(!json.contains(&hex::encode(key.secret_bytes())));

        let restored = EncryptedKeyStore::import(&exported).unwrap();
        assert!(restored.is_locked());
        restored.unlock("pw").unwrap();
        assert_eq!(restored.get_private_key(&pk).unwrap(), key);
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn missing_key_is_reported() {
        let store = EncryptedKeyStore::create("pw").unwrap();
        let stranger = PrivateKey::generate().public_key();
        assert!(matches!(
            store.get_private_key(&stranger),
            Err(KeyStoreError::MissingKey { .. })
        ));
    }
}
