//! Where account authorities come from: an in-memory table for offline
//! work and tests, or a ledger node via `database_api.find_accounts`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::types::{AccountAuthorities, Authority, Permission};
use crate::network::transport::{RpcTransport, TransportError};

/// Errors surfaced by authority lookups.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// Permission name outside owner/active/posting.
    #[error("invalid permission: {0:?}")]
    InvalidPermission(String),

    /// The ledger has no account by that name.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// The account record did not carry parseable authorities.
    #[error("malformed account record for {account}: {reason}")]
    MalformedAccount { account: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Read-only access to account authorities.
pub trait AuthorityProvider {
    fn get_account(&self, account: &str) -> Result<AccountAuthorities, AuthorityError>;

    fn get_authority(
        &self,
        account: &str,
        permission: Permission,
    ) -> Result<Authority, AuthorityError> {
        Ok(self.get_account(account)?.get(permission).clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryAuthorities
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryAuthorities {
    accounts: HashMap<String, AccountAuthorities>,
}

impl MemoryAuthorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: AccountAuthorities) {
        self.accounts.insert(account.name.clone(), account);
    }

    pub fn with_account(mut self, account: AccountAuthorities) -> Self {
        self.insert(account);
        self
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AuthorityProvider for MemoryAuthorities {
    fn get_account(&self, account: &str) -> Result<AccountAuthorities, AuthorityError> {
        self.accounts
            .get(account)
            .cloned()
            .ok_or_else(|| AuthorityError::UnknownAccount(account.to_string()))
    }
}

// ---------------------------------------------------------------------------
// RpcAuthorityProvider
// ---------------------------------------------------------------------------

/// Reads authorities from chain state on every call. Nothing is cached.
pub struct RpcAuthorityProvider {
    transport: Arc<dyn RpcTransport>,
}

impl RpcAuthorityProvider {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }
}

impl AuthorityProvider for RpcAuthorityProvider {
    fn get_account(&self, account: &str) -> Result<AccountAuthorities, AuthorityError> {
        let records = self.transport.find_accounts(&[account])?;
        debug!(account, records = records.len(), "find_accounts");

        let record = records
            .into_iter()
            .find(|r| r.get("name").and_then(|n| n.as_str()) == Some(account))
            .ok_or_else(|| AuthorityError::UnknownAccount(account.to_string()))?;

        serde_json::from_value(record).map_err(|e| AuthorityError::MalformedAccount {
            account: account.to_string(),
            reason: e.to_string(),
        })
    }
}
