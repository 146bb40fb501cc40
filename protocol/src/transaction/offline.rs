//! Offline, multi-party signing.
//!
//! An online party builds the transaction and attaches a side channel
//! describing who must sign: the authorities involved and the public keys
//! that may be needed. The file travels to disconnected signers, each of
//! whom loads it, adds whatever keys they hold and signs without touching
//! the network.
//!
//! On the wire the side channel sits next to the canonical transaction:
//!
//! ```json
//! {
//!   "ref_block_num": 1234, "ref_block_prefix": 5678,
//!   "expiration": "2026-03-01T12:00:30",
//!   "operations": [["transfer", {...}]], "extensions": [], "signatures": [],
//!   "required_authorities": { "alice": {...}, "bob": {...} },
//!   "missing_signatures": ["MPH...", "MPH..."],
//!   "blockchain": { "chain_id": "...", "prefix": "MPH" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::builder::TransactionBuilder;
use super::error::{BuilderError, BuilderResult};
use super::types::SignedTransaction;
use crate::authority::{Authority, AuthorityError, Permission};
use crate::crypto::keys::PublicKey;

/// Who must sign, for a signer that cannot ask the ledger.
///
/// `missing_signatures` is a superset of the keys actually required: the
/// account's own keys plus one level of its delegates' keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineSigningRequest {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_authorities: BTreeMap<String, Authority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_signatures: Vec<String>,
}

impl OfflineSigningRequest {
    pub fn is_empty(&self) -> bool {
        self.required_authorities.is_empty() && self.missing_signatures.is_empty()
    }

    fn push_missing(&mut self, key: &str) {
        if !self.missing_signatures.iter().any(|k| k == key) {
            self.missing_signatures.push(key.to_string());
        }
    }
}

/// Network identity recorded alongside a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain_id: String,
    pub prefix: String,
}

/// A transaction in transit between signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    #[serde(flatten)]
    pub transaction: SignedTransaction,
    #[serde(flatten)]
    pub signing: OfflineSigningRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain: Option<ChainParams>,
}

impl PendingTransaction {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl TransactionBuilder {
    /// Attach signing information for `account` (or a single public key)
    /// so the transaction can be completed offline.
    ///
    /// Records the account's authority for `permission` and one level of
    /// its delegates' authorities, and lists every key they name. Constructs
    /// the transaction first when it does not exist yet; with `reconstruct`
    /// it is rebuilt, discarding any signatures.
    ///
    /// A transaction whose operations changed since construction is rebuilt
    /// even when `reconstruct` is false, so signatures collected before the
    /// change are dropped. The side channel must describe the operations
    /// that will actually be signed.
    pub fn add_signing_information(
        &mut self,
        account: &str,
        permission: &str,
        reconstruct: bool,
    ) -> BuilderResult<&OfflineSigningRequest> {
        let permission: Permission = permission.parse()?;
        if reconstruct {
            self.dirty = true;
        }
        if self.tx.is_none() || self.dirty {
            self.construct_tx(None, None)?;
        }
        self.chain = Some(ChainParams {
            chain_id: self.config.chain_id.clone(),
            prefix: self.config.key_prefix.clone(),
        });

        if PublicKey::from_prefixed(account, &self.config.key_prefix).is_ok() {
            self.signing_info.missing_signatures = vec![account.to_string()];
            return Ok(&self.signing_info);
        }

        let authority = self.authorities.get_authority(account, permission)?;
        let mut request = OfflineSigningRequest::default();
        for key in authority.public_keys() {
            request.push_missing(key);
        }
        for (delegate, _) in &authority.account_auths {
            match self.authorities.get_authority(delegate, permission) {
                Ok(delegate_auth) => {
                    for key in delegate_auth.public_keys() {
                        request.push_missing(key);
                    }
                    request
                        .required_authorities
                        .insert(delegate.clone(), delegate_auth);
                }
                Err(AuthorityError::UnknownAccount(_)) => {
                    warn!(%account, %delegate, "delegate account not found, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        request
            .required_authorities
            .insert(account.to_string(), authority);

        info!(
            %account,
            %permission,
            authorities = request.required_authorities.len(),
            keys = request.missing_signatures.len(),
            "signing information attached"
        );
        self.signing_info = request;
        Ok(&self.signing_info)
    }

    /// Pull every listed missing key the local key store holds into the
    /// signing set. Keys the store does not have are skipped. Returns the
    /// number of keys added.
    pub fn append_missing_signatures(&mut self) -> BuilderResult<usize> {
        if self.keys.is_locked() {
            return Err(BuilderError::WalletLocked);
        }

        let mut added = 0;
        for text in &self.signing_info.missing_signatures {
            let public_key = match PublicKey::from_prefixed(text, &self.config.key_prefix) {
                Ok(pk) => pk,
                Err(e) => {
                    debug!(key = %text, error = %e, "unparsable missing signature key");
                    continue;
                }
            };
            match self.keys.get_private_key(&public_key) {
                Ok(key) => {
                    if self.signers.insert(key) {
                        added += 1;
                    }
                }
                Err(e) => debug!(key = %text, error = %e, "missing signature not held locally"),
            }
        }

        info!(
            added,
            listed = self.signing_info.missing_signatures.len(),
            "missing signatures appended"
        );
        Ok(added)
    }

    pub fn signing_request(&self) -> &OfflineSigningRequest {
        &self.signing_info
    }

    /// Continue a transaction produced elsewhere. Replaces whatever this
    /// builder held, except for collected keys.
    pub fn load_pending(&mut self, pending: PendingTransaction) {
        if let Some(chain) = &pending.blockchain {
            if chain.chain_id != self.config.chain_id {
                warn!(
                    pending = %chain.chain_id,
                    configured = %self.config.chain_id,
                    "pending transaction was prepared for another chain"
                );
            }
        }
        self.ops = pending.transaction.operations.clone();
        self.tx = Some(pending.transaction);
        self.dirty = false;
        self.signing_info = pending.signing;
        self.chain = pending.blockchain;
        debug!(status = %self.status(), "pending transaction loaded");
    }

    /// Snapshot the transaction and its side channel for hand-off.
    pub fn to_pending(&mut self) -> BuilderResult<PendingTransaction> {
        Ok(PendingTransaction {
            transaction: self.json()?,
            signing: self.signing_info.clone(),
            blockchain: self.chain.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::{AccountAuthorities, MemoryAuthorities};
    use crate::config::{ClientConfig, DEFAULT_KEY_PREFIX};
    use crate::crypto::keys::PrivateKey;
    use crate::transaction::codec::ReferenceCodec;
    use crate::transaction::types::{Operation, TransactionStatus};
    use crate::wallet::MemoryKeyStore;
    use serde_json::json;
    use std::sync::Arc;

    fn text(key: &PrivateKey) -> String {
        key.public_key().to_prefixed(DEFAULT_KEY_PREFIX)
    }

    fn builder(keys: MemoryKeyStore, authorities: MemoryAuthorities) -> TransactionBuilder {
        TransactionBuilder::new(
            Arc::new(keys),
            Arc::new(authorities),
            Arc::new(ReferenceCodec::default()),
            ClientConfig::default(),
        )
    }

    fn transfer() -> Operation {
        Operation::from_json("transfer", json!({ "from": "alice", "to": "bob", "amount": "1.000 MORPH" }))
    }

    #[test]
    fn signing_information_covers_one_delegate_level() {
        let (k_alice, k_bob, k_carol) = (PrivateKey::generate(), PrivateKey::generate(), PrivateKey::generate());
        let authorities = MemoryAuthorities::new()
            .with_account(AccountAuthorities::uniform(
                "alice",
                Authority::single_key(text(&k_alice)).with_account("bob", 1),
            ))
            .with_account(AccountAuthorities::uniform(
                "bob",
                Authority::single_key(text(&k_bob)).with_account("carol", 1),
            ))
            .with_account(AccountAuthorities::uniform("carol", Authority::single_key(text(&k_carol))));

        let mut tx = builder(MemoryKeyStore::new(), authorities);
        tx.append_ops(transfer());
        tx.construct_tx(Some(1), Some(2)).unwrap();
        let request = tx.add_signing_information("alice", "active", false).unwrap();

        assert_eq!(request.missing_signatures, vec![text(&k_alice), text(&k_bob)]);
        assert_eq!(
            request.required_authorities.keys().collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn signing_information_for_public_key() {
        let key = PrivateKey::generate();
        let mut tx = builder(MemoryKeyStore::new(), MemoryAuthorities::new());
        tx.append_ops(transfer());
        tx.construct_tx(Some(1), Some(2)).unwrap();

        let request = tx.add_signing_information(&text(&key), "owner", false).unwrap();
        assert_eq!(request.missing_signatures, vec![text(&key)]);
    }

    #[test]
    fn signing_information_needs_transport_when_unconstructed() {
        let mut tx = builder(MemoryKeyStore::new(), MemoryAuthorities::new());
        tx.append_ops(transfer());
        assert!(matches!(
            tx.add_signing_information("alice", "active", false),
            Err(BuilderError::OfflineUnavailable)
        ));
    }

    #[test]
    fn signing_information_rebuilds_changed_transaction() {
        let transport = Arc::new(crate::network::ScriptedTransport::new());
        transport.with_head_block(50, 9);
        let mut tx = builder(MemoryKeyStore::new(), MemoryAuthorities::new()).with_transport(transport);
        tx.append_ops(transfer());
        tx.construct_tx(Some(1), Some(2)).unwrap();
        tx.append_key(PrivateKey::generate());
        tx.sign(false).unwrap();
        assert_eq!(tx.transaction().unwrap().signatures.len(), 1);

        tx.append_ops(transfer());
        let key = PrivateKey::generate();
        tx.add_signing_information(&text(&key), "active", false).unwrap();

        let rebuilt = tx.transaction().unwrap();
        assert!(rebuilt.signatures.is_empty());
        assert_eq!(rebuilt.operations.len(), 2);
        assert_eq!(rebuilt.ref_block_num, 50);
        assert_eq!(tx.status(), TransactionStatus::Constructed);
    }

    #[test]
    fn missing_signatures_skip_unknown_keys() {
        let held = PrivateKey::generate();
        let foreign = PrivateKey::generate();
        let mut keys = MemoryKeyStore::new();
        keys.add(held.clone());

        let mut tx = builder(keys, MemoryAuthorities::new());
        tx.signing_info.missing_signatures = vec![text(&foreign), "garbage".into(), text(&held)];

        assert_eq!(tx.append_missing_signatures().unwrap(), 1);
        assert_eq!(tx.signing_key_count(), 1);
        // again: already collected
        assert_eq!(tx.append_missing_signatures().unwrap(), 0);
    }

    #[test]
    fn pending_round_trip_through_json() {
        let key = PrivateKey::generate();
        let authorities = MemoryAuthorities::new()
            .with_account(AccountAuthorities::uniform("alice", Authority::single_key(text(&key))));
        let mut online = builder(MemoryKeyStore::new(), authorities);
        online.append_ops(transfer());
        online.construct_tx(Some(10), Some(20)).unwrap();
        online.add_signing_information("alice", "active", false).unwrap();

        let file = online.to_pending().unwrap().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&file).unwrap();
        assert_eq!(value["ref_block_num"], 10);
        assert_eq!(value["missing_signatures"][0], text(&key));
        assert_eq!(value["blockchain"]["prefix"], DEFAULT_KEY_PREFIX);

        let mut keys = MemoryKeyStore::new();
        keys.add(key.clone());
        let mut offline = builder(keys, MemoryAuthorities::new());
        offline.load_pending(PendingTransaction::from_json(&file).unwrap());
        assert_eq!(offline.status(), TransactionStatus::Constructed);
        assert_eq!(offline.list_operations().len(), 1);

        offline.append_missing_signatures().unwrap();
        let signed = offline.sign(false).unwrap().unwrap();
        assert_eq!(signed.signatures.len(), 1);
        assert_eq!(signed.ref_block_num, 10);

        let codec = ReferenceCodec::default();
        assert!(codec.verify(&signed, &key.public_key(), &signed.signatures[0]).unwrap());
    }

    #[test]
    fn plain_transaction_parses_as_pending() {
        let pending = PendingTransaction::from_json(
            r#"{"ref_block_num":1,"ref_block_prefix":2,"expiration":"2026-01-01T00:00:00",
                "operations":[["vote",{"voter":"alice"}]],"extensions":[],"signatures":["aa"]}"#,
        )
        .unwrap();
        assert!(pending.signing.is_empty());
        assert!(pending.blockchain.is_none());

        let mut tx = builder(MemoryKeyStore::new(), MemoryAuthorities::new());
        tx.load_pending(pending);
        assert_eq!(tx.status(), TransactionStatus::Signed);
    }
}
