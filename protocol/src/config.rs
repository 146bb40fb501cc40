//! # Client Configuration & Constants
//!
//! Every magic number the transaction layer depends on lives here, together
//! with the two serde-loadable knobs structs: [`ClientConfig`] (what the
//! builder consults) and [`TransportConfig`] (what the HTTP transport
//! consults).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Chain Parameters
// ---------------------------------------------------------------------------

/// Public-key prefix used when no network is configured.
pub const DEFAULT_KEY_PREFIX: &str = "MPH";

/// Chain id used when no network is configured: 32 zero bytes, hex-encoded.
/// Signatures produced under it are only meaningful on a test chain.
pub const DEFAULT_CHAIN_ID: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Version byte prepended to the secret before WIF encoding.
pub const WIF_VERSION_BYTE: u8 = 0x80;

/// Length of the truncated checksum appended to encoded keys.
pub const KEY_CHECKSUM_LENGTH: usize = 4;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Signing key length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. Twelve, always.
pub const AES_NONCE_LENGTH: usize = 12;

/// Salt length for passphrase key derivation.
pub const KDF_SALT_LENGTH: usize = 16;

/// Number of leading digest bytes that form a transaction id.
pub const TRANSACTION_ID_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Transaction Parameters
// ---------------------------------------------------------------------------

/// Default distance between construction time and transaction expiration.
pub const DEFAULT_EXPIRATION_SECS: u64 = 30;

/// Number of delegate levels the authority resolver will visit, counting
/// the signing account itself as the first.
pub const MAX_AUTHORITY_DEPTH: usize = 3;

/// Timestamp layout used in the canonical transaction (`expiration`).
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// RPC Parameters
// ---------------------------------------------------------------------------

/// Attempts per node before the transport rotates to the next one.
pub const DEFAULT_RPC_RETRIES: u32 = 3;

/// Per-request timeout for the HTTP transport.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How a signed transaction is handed to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// Block until the transaction is included and return the receipt.
    #[default]
    Synchronous,
    /// Fire and forget.
    Asynchronous,
}

/// Per-client settings consulted by the transaction builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Seconds between construction and expiration.
    pub expiration_secs: u64,
    /// Public-key prefix of the target network.
    pub key_prefix: String,
    /// Hex-encoded chain id mixed into every signature digest.
    pub chain_id: String,
    /// When set, `broadcast` logs and clears instead of submitting.
    pub dry_run: bool,
    /// Synchronous or fire-and-forget submission.
    pub broadcast_mode: BroadcastMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            dry_run: false,
            broadcast_mode: BroadcastMode::Synchronous,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The expiration window as a `Duration`.
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/// Settings for [`crate::network::HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Node URLs in preference order.
    pub nodes: Vec<String>,
    /// Attempts per node before rotating.
    pub num_retries: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            num_retries: DEFAULT_RPC_RETRIES,
            timeout_secs: DEFAULT_RPC_TIMEOUT.as_secs(),
        }
    }
}

impl TransportConfig {
    /// Parses a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_id_is_32_bytes() {
        let bytes = hex::decode(DEFAULT_CHAIN_ID).unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn client_config_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.expiration(), Duration::from_secs(30));
        assert_eq!(cfg.key_prefix, "MPH");
        assert!(!cfg.dry_run);
        assert_eq!(cfg.broadcast_mode, BroadcastMode::Synchronous);
    }

    #[test]
    fn client_config_partial_toml_keeps_defaults() {
        let cfg = ClientConfig::from_toml_str(
            r#"
            expiration_secs = 120
            dry_run = true
            broadcast_mode = "asynchronous"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.expiration_secs, 120);
        assert!(cfg.dry_run);
        assert_eq!(cfg.broadcast_mode, BroadcastMode::Asynchronous);
        assert_eq!(cfg.key_prefix, DEFAULT_KEY_PREFIX);
    }

    #[test]
    fn client_config_rejects_bad_toml() {
        assert!(ClientConfig::from_toml_str("expiration_secs = \"soon\"").is_err());
    }

    #[test]
    fn transport_config_parses_node_list() {
        let cfg = TransportConfig::from_toml_str(
            r#"nodes = ["https://a.example", "https://b.example"]"#,
        )
        .unwrap();
        assert_eq!(cfg.nodes.len(), 2);
        assert_eq!(cfg.num_retries, DEFAULT_RPC_RETRIES);
        assert_eq!(cfg.timeout(), DEFAULT_RPC_TIMEOUT);
    }

    #[test]
    fn depth_bound_is_three_levels() {
        assert_eq!(MAX_AUTHORITY_DEPTH, 3);
    }
}
