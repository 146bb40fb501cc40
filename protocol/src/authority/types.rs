//! Permission tiers and weighted-threshold authorities, in the JSON shape
//! ledger nodes return them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::provider::AuthorityError;

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

/// A named authorization tier on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Owner,
    Active,
    Posting,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Active => "active",
            Self::Posting => "posting",
        }
    }
}

impl FromStr for Permission {
    type Err = AuthorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "active" => Ok(Self::Active),
            "posting" => Ok(Self::Posting),
            other => Err(AuthorityError::InvalidPermission(other.to_string())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// A weighted-threshold authority.
///
/// ```json
/// {
///   "weight_threshold": 1,
///   "account_auths": [["bob", 1]],
///   "key_auths": [["MPH6LLeg...", 1]]
/// }
/// ```
///
/// Keys stay in their prefixed text form: the prefix is a property of the
/// network, and the resolver parses them against the configured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    #[serde(default)]
    pub account_auths: Vec<(String, u32)>,
    #[serde(default)]
    pub key_auths: Vec<(String, u32)>,
}

impl Authority {
    /// A single-key authority with threshold 1.
    pub fn single_key(public_key: impl Into<String>) -> Self {
        Self {
            weight_threshold: 1,
            account_auths: Vec::new(),
            key_auths: vec![(public_key.into(), 1)],
        }
    }

    pub fn with_key(mut self, public_key: impl Into<String>, weight: u32) -> Self {
        self.key_auths.push((public_key.into(), weight));
        self
    }

    pub fn with_account(mut self, account: impl Into<String>, weight: u32) -> Self {
        self.account_auths.push((account.into(), weight));
        self
    }

    /// Sum of the weights of `key_auths` entries whose key is in `keys`.
    pub fn key_weight_sum(&self, keys: &HashSet<String>) -> u64 {
        self.key_auths
            .iter()
            .filter(|(key, _)| keys.contains(key))
            .map(|(_, weight)| u64::from(*weight))
            .sum()
    }

    /// Whether `keys` alone reach the threshold. Delegate weight is not
    /// counted.
    pub fn satisfied_by(&self, keys: &HashSet<String>) -> bool {
        self.key_weight_sum(keys) >= u64::from(self.weight_threshold)
    }

    /// Every key listed directly on this authority, in order.
    pub fn public_keys(&self) -> impl Iterator<Item = &str> {
        self.key_auths.iter().map(|(key, _)| key.as_str())
    }
}

/// The three authorities an account carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAuthorities {
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
}

impl AccountAuthorities {
    pub fn get(&self, permission: Permission) -> &Authority {
        match permission {
            Permission::Owner => &self.owner,
            Permission::Active => &self.active,
            Permission::Posting => &self.posting,
        }
    }

    /// Same authority for every tier.
    pub fn uniform(name: impl Into<String>, authority: Authority) -> Self {
        Self {
            name: name.into(),
            owner: authority.clone(),
            active: authority.clone(),
            posting: authority,
        }
    }
}
