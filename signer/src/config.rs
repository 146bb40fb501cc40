//! Signer configuration file.
//!
//! ```toml
//! [client]
//! key_prefix = "MPH"
//! chain_id = "..."
//! expiration_secs = 60
//!
//! [transport]
//! nodes = ["https://api.example.com"]
//! num_retries = 3
//! ```
//!
//! Both sections are optional. Command-line flags override what is read
//! here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use quill_protocol::config::{ClientConfig, TransportConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub client: ClientConfig,
    pub transport: TransportConfig,
}

impl SignerConfig {
    /// Load from `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), nodes = config.transport.nodes.len(), "config loaded");
        Ok(config)
    }
}
