//! The key-store contract the transaction builder signs through, plus the
//! plain in-memory implementation used by offline signers and tests.

use std::collections::HashMap;

use thiserror::Error;

use crate::crypto::encryption::EncryptionError;
use crate::crypto::keys::{KeyError, PrivateKey, PublicKey};

/// Errors surfaced by key stores.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The store holds no private key for the requested public key.
    #[error("no private key stored for {public_key}")]
    MissingKey { public_key: String },

    /// The store is locked and cannot hand out secrets.
    #[error("key store is locked")]
    Locked,

    /// `unlock` was called with the wrong passphrase.
    #[error("wrong passphrase")]
    WrongPassphrase,

    #[error("invalid key material: {0}")]
    InvalidKey(#[from] KeyError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// Resolves public keys to private signing keys.
///
/// Implementations decide where secrets live; the builder only asks for one
/// key at a time and treats a failed lookup as "this signer is not local".
pub trait KeyStore {
    /// The private key matching `public_key`.
    fn get_private_key(&self, public_key: &PublicKey) -> Result<PrivateKey, KeyStoreError>;

    /// Whether the store currently refuses to hand out secrets.
    fn is_locked(&self) -> bool;
}

/// Unencrypted, always-unlocked key store.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyStore {
    keys: HashMap<PublicKey, PrivateKey>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from WIF strings, failing on the first malformed one.
    pub fn from_wifs<I, S>(wifs: I) -> Result<Self, KeyStoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for wif in wifs {
            store.add_wif(wif.as_ref())?;
        }
        Ok(store)
    }

    /// Insert a key, returning its public half.
    pub fn add(&mut self, key: PrivateKey) -> PublicKey {
        let public_key = key.public_key();
        self.keys.insert(public_key, key);
        public_key
    }

    pub fn add_wif(&mut self, wif: &str) -> Result<PublicKey, KeyStoreError> {
        Ok(self.add(PrivateKey::from_wif(wif)?))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get_private_key(&self, public_key: &PublicKey) -> Result<PrivateKey, KeyStoreError> {
        self.keys
            .get(public_key)
            .cloned()
            .ok_or_else(|| KeyStoreError::MissingKey {
                public_key: public_key.to_hex(),
            })
    }

    fn is_locked(&self) -> bool {
        false
    }
}
