//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for the reference signing keys.
//! - **SHA-256** (`sha2`) for checksums, digests and transaction ids.
//! - **AES-256-GCM** (`aes-gcm`) plus **Argon2id** (`argon2`) for the
//!   encrypted key store.
//!
//! Nothing here is clever on purpose.

pub mod encryption;
pub mod hash;
pub mod keys;

pub use encryption::{decrypt, derive_key, encrypt, EncryptionError};
pub use hash::{double_sha256, sha256, sha256_multi};
pub use keys::{KeyError, PrivateKey, PublicKey};
