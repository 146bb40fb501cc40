//! # Wallet — Key Stores
//!
//! Where private keys live. The transaction builder never holds a store's
//! secrets longer than one signing session; it asks a [`KeyStore`] for the
//! key behind each public key it discovers and forgets the ones it cannot
//! get.
//!
//! ```text
//! keystore.rs  — KeyStore trait, KeyStoreError, MemoryKeyStore
//! encrypted.rs — EncryptedKeyStore (AES-256-GCM + Argon2id, lock/unlock)
//! ```

pub mod encrypted;
pub mod keystore;

pub use encrypted::{EncryptedKeyStore, SealedWallet};
pub use keystore::{KeyStore, KeyStoreError, MemoryKeyStore};
