//! Weighted-threshold key discovery over the delegate-account graph.
//!
//! Starting from one account's authority, the resolver asks the key store
//! for every listed key. When the keys found at a level do not reach the
//! root threshold it walks into the delegate accounts, fetching each
//! delegate's authority for the same permission, until the depth bound is
//! hit. Every discovered key is returned; whether they suffice is for the
//! ledger to decide.
//!
//! ```text
//!   alice/active (threshold 2)
//!   ├── key K1 (w=1)           ── found
//!   └── account bob (w=1)      ── depth 1
//!        ├── key K2 (w=1)      ── found
//!        └── account carol     ── depth 2
//!             └── account dave ── depth 3: not visited
//! ```
//!
//! The graph may contain cycles. Each account is visited at most once and
//! the walk uses an explicit stack, so hostile delegate chains cost at most
//! `max_depth` levels and never grow the call stack.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::provider::{AuthorityError, AuthorityProvider};
use super::types::{Authority, Permission};
use crate::config::MAX_AUTHORITY_DEPTH;
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::wallet::KeyStore;

/// A private key located during resolution, with where it was found.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub account: String,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    pub weight: u32,
    /// 0 for the signing account, 1 for its delegates, and so on.
    pub depth: usize,
}

pub struct AuthorityResolver<'a> {
    keys: &'a dyn KeyStore,
    authorities: &'a dyn AuthorityProvider,
    prefix: &'a str,
    max_depth: usize,
}

impl<'a> AuthorityResolver<'a> {
    pub fn new(
        keys: &'a dyn KeyStore,
        authorities: &'a dyn AuthorityProvider,
        prefix: &'a str,
    ) -> Self {
        Self {
            keys,
            authorities,
            prefix,
            max_depth: MAX_AUTHORITY_DEPTH,
        }
    }

    /// Number of levels visited, the signing account included.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Look up `account`'s authority for `permission` and resolve it.
    ///
    /// A failed lookup of the signing account itself is a hard error.
    pub fn resolve(
        &self,
        account: &str,
        permission: Permission,
    ) -> Result<Vec<ResolvedKey>, AuthorityError> {
        let authority = self.authorities.get_authority(account, permission)?;
        self.resolve_authority(account, &authority, permission)
    }

    /// Resolve an authority already in hand.
    pub fn resolve_authority(
        &self,
        account: &str,
        authority: &Authority,
        permission: Permission,
    ) -> Result<Vec<ResolvedKey>, AuthorityError> {
        // The root threshold is the yardstick at every level.
        let threshold = u64::from(authority.weight_threshold);

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(account.to_string());
        let mut stack: Vec<(String, Authority, usize)> =
            vec![(account.to_string(), authority.clone(), 0)];
        let mut found = Vec::new();

        while let Some((name, auth, depth)) = stack.pop() {
            let matched = self.match_keys(&name, &auth, depth);
            let weight: u64 = matched.iter().map(|k| u64::from(k.weight)).sum();
            debug!(
                account = %name,
                %permission,
                depth,
                matched = matched.len(),
                weight,
                threshold,
                "resolved authority level"
            );
            found.extend(matched);

            if weight >= threshold || depth + 1 >= self.max_depth {
                continue;
            }

            // Reversed so that delegates pop off the stack in listed order.
            for (delegate, _) in auth.account_auths.iter().rev() {
                if !visited.insert(delegate.clone()) {
                    continue;
                }
                match self.authorities.get_authority(delegate, permission) {
                    Ok(delegate_auth) => stack.push((delegate.clone(), delegate_auth, depth + 1)),
                    Err(AuthorityError::UnknownAccount(_)) => {
                        warn!(account = %name, %delegate, "delegate account not found, skipping");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(found)
    }

    /// Keys of one authority level the store can supply. Everything else is
    /// a soft miss.
    fn match_keys(&self, account: &str, authority: &Authority, depth: usize) -> Vec<ResolvedKey> {
        let mut matched = Vec::new();
        for (text, weight) in &authority.key_auths {
            let public_key = match PublicKey::from_prefixed(text, self.prefix) {
                Ok(pk) => pk,
                Err(e) => {
                    debug!(account, key = %text, error = %e, "unparsable authority key");
                    continue;
                }
            };
            match self.keys.get_private_key(&public_key) {
                Ok(private_key) => matched.push(ResolvedKey {
                    account: account.to_string(),
                    public_key,
                    private_key,
                    weight: *weight,
                    depth,
                }),
                Err(e) => debug!(account, key = %text, error = %e, "key not available locally"),
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::{AccountAuthorities, MemoryAuthorities};
    use crate::config::DEFAULT_KEY_PREFIX;
    use crate::wallet::MemoryKeyStore;

    fn key_text(key: &PrivateKey) -> String {
        key.public_key().to_prefixed(DEFAULT_KEY_PREFIX)
    }

    /// A linear delegate chain: every account holds one local key of weight
    /// 1, threshold 2, and delegates to the next account.
    fn chain(names: &[&str]) -> (MemoryKeyStore, MemoryAuthorities, Vec<PrivateKey>) {
        let mut store = MemoryKeyStore::new();
        let mut provider = MemoryAuthorities::new();
        let mut keys = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let key = PrivateKey::generate();
            store.add(key.clone());
            let mut auth = Authority {
                weight_threshold: 2,
                account_auths: vec![],
                key_auths: vec![(key_text(&key), 1)],
            };
            if let Some(next) = names.get(i + 1) {
                auth = auth.with_account(*next, 1);
            }
            provider.insert(AccountAuthorities::uniform(*name, auth));
            keys.push(key);
        }
        (store, provider, keys)
    }

    #[test]
    fn single_key_authority() {
        let key = PrivateKey::generate();
        let mut store = MemoryKeyStore::new();
        store.add(key.clone());
        let provider = MemoryAuthorities::new()
            .with_account(AccountAuthorities::uniform("alice", Authority::single_key(key_text(&key))));

        let found = AuthorityResolver::new(&store, &provider, DEFAULT_KEY_PREFIX)
            .resolve("alice", Permission::Active)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].public_key, key.public_key());
        assert_eq!(found[0].depth, 0);
    }

    #[test]
    fn depth_bound_stops_at_third_level() {
        let (store, provider, keys) = chain(&["alice", "bob", "carol", "dave"]);
        let found = AuthorityResolver::new(&store, &provider, DEFAULT_KEY_PREFIX)
            .resolve("alice", Permission::Active)
            .unwrap();

        let got: Vec<PublicKey> = found.iter().map(|k| k.public_key).collect();
        assert_eq!(
            got,
            vec![keys[0].public_key(), keys[1].public_key(), keys[2].public_key()]
        );
        assert_eq!(found.iter().map(|k| k.depth).max(), Some(2));
    }

    #[test]
    fn threshold_met_locally_skips_delegates() {
        let (store, provider, _) = chain(&["alice", "bob"]);
        let root = provider.get_authority("alice", Permission::Active).unwrap();
        let mut generous = root.clone();
        generous.weight_threshold = 1;

        let found = AuthorityResolver::new(&store, &provider, DEFAULT_KEY_PREFIX)
            .resolve_authority("alice", &generous, Permission::Active)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].account, "alice");
    }

    #[test]
    fn cycles_terminate() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        let mut store = MemoryKeyStore::new();
        store.add(a.clone());
        store.add(b.clone());
        let provider = MemoryAuthorities::new()
            .with_account(AccountAuthorities::uniform(
                "alice",
                Authority {
                    weight_threshold: 10,
                    account_auths: vec![("bob".into(), 1)],
                    key_auths: vec![(key_text(&a), 1)],
                },
            ))
            .with_account(AccountAuthorities::uniform(
                "bob",
                Authority {
                    weight_threshold: 10,
                    account_auths: vec![("alice".into(), 1)],
                    key_auths: vec![(key_text(&b), 1)],
                },
            ));

        let found = AuthorityResolver::new(&store, &provider, DEFAULT_KEY_PREFIX)
            .with_max_depth(50)
            .resolve("alice", Permission::Owner)
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn soft_misses_are_skipped() {
        let local = PrivateKey::generate();
        let remote = PrivateKey::generate();
        let mut store = MemoryKeyStore::new();
        store.add(local.clone());
        let provider = MemoryAuthorities::new().with_account(AccountAuthorities::uniform(
            "alice",
            Authority {
                weight_threshold: 3,
                account_auths: vec![("ghost".into(), 1)],
                key_auths: vec![
                    ("not-a-key".into(), 1),
                    (key_text(&remote), 1),
                    (key_text(&local), 1),
                ],
            },
        ));

        let found = AuthorityResolver::new(&store, &provider, DEFAULT_KEY_PREFIX)
            .resolve("alice", Permission::Posting)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].public_key, local.public_key());
    }

    #[test]
    fn unknown_root_account_is_an_error() {
        let store = MemoryKeyStore::new();
        let provider = MemoryAuthorities::new();
        let result = AuthorityResolver::new(&store, &provider, DEFAULT_KEY_PREFIX)
            .resolve("nobody", Permission::Active);
        assert!(matches!(result, Err(AuthorityError::UnknownAccount(_))));
    }
}
