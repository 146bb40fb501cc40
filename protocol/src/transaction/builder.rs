//! The transaction builder: collects operations and signing keys, then
//! constructs, signs and broadcasts a single transaction.
//!
//! ```text
//!   append_ops ─┐
//!   append_signer ──▶ SigningKeySet
//!   append_wif ─┘             │
//!        construct_tx ──▶ codec.build ──▶ sign ──▶ codec.sign ──▶ broadcast ──▶ clear
//!              ▲                                                      │
//!              └── get_block_params (transport, if not supplied)      └── transport
//! ```
//!
//! A builder owns exactly one in-progress transaction. After `broadcast`
//! (successful or not) it is reset and can start over.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::codec::TransactionCodec;
use super::error::{BuilderError, BuilderResult};
use super::offline::{ChainParams, OfflineSigningRequest};
use super::signers::SigningKeySet;
use super::types::{
    BlockParams, BroadcastResult, Operation, SignedTransaction, TransactionStatus,
};
use crate::authority::{AuthorityProvider, AuthorityResolver, Permission};
use crate::config::{BroadcastMode, ClientConfig, EXPIRATION_FORMAT};
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::network::transport::RpcTransport;
use crate::wallet::{KeyStore, KeyStoreError};

/// Assembles, signs and submits one transaction at a time.
///
/// Collaborators are injected at construction. The transport is optional:
/// without one the builder works offline, and anything that needs the
/// network fails with [`BuilderError::OfflineUnavailable`].
///
/// # Usage
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use quill_protocol::authority::MemoryAuthorities;
/// use quill_protocol::config::ClientConfig;
/// use quill_protocol::transaction::{Operation, ReferenceCodec, TransactionBuilder};
/// use quill_protocol::wallet::MemoryKeyStore;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = TransactionBuilder::new(
///     Arc::new(MemoryKeyStore::new()),
///     Arc::new(MemoryAuthorities::new()),
///     Arc::new(ReferenceCodec::default()),
///     ClientConfig::default(),
/// );
/// tx.append_ops(Operation::from_json("vote", json!({ "voter": "alice" })));
/// tx.append_wif("5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3")?;
/// tx.construct_tx(Some(1234), Some(5678))?;
/// let signed = tx.sign(true)?;
/// # Ok(())
/// # }
/// ```
pub struct TransactionBuilder {
    pub(super) keys: Arc<dyn KeyStore>,
    pub(super) authorities: Arc<dyn AuthorityProvider>,
    codec: Arc<dyn TransactionCodec>,
    transport: Option<Arc<dyn RpcTransport>>,
    pub(super) config: ClientConfig,
    expiration: Duration,

    pub(super) ops: Vec<Operation>,
    pub(super) signers: SigningKeySet,
    signing_accounts: Vec<String>,
    pub(super) tx: Option<SignedTransaction>,
    /// Operations changed since `tx` was built.
    pub(super) dirty: bool,
    pub(super) signing_info: OfflineSigningRequest,
    pub(super) chain: Option<ChainParams>,
}

impl TransactionBuilder {
    pub fn new(
        keys: Arc<dyn KeyStore>,
        authorities: Arc<dyn AuthorityProvider>,
        codec: Arc<dyn TransactionCodec>,
        config: ClientConfig,
    ) -> Self {
        let expiration = config.expiration();
        Self {
            keys,
            authorities,
            codec,
            transport: None,
            config,
            expiration,
            ops: Vec::new(),
            signers: SigningKeySet::new(),
            signing_accounts: Vec::new(),
            tx: None,
            dirty: false,
            signing_info: OfflineSigningRequest::default(),
            chain: None,
        }
    }

    /// Attach an RPC transport, enabling online operations.
    pub fn with_transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Distance between construction time and expiration.
    pub fn set_expiration(&mut self, expiration: Duration) {
        self.expiration = expiration;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_online(&self) -> bool {
        self.transport.is_some()
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn status(&self) -> TransactionStatus {
        match &self.tx {
            _ if self.dirty && !self.ops.is_empty() => TransactionStatus::Dirty,
            None if self.ops.is_empty() => TransactionStatus::Empty,
            None => TransactionStatus::Dirty,
            Some(tx) if tx.is_signed() => TransactionStatus::Signed,
            Some(_) => TransactionStatus::Constructed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn list_operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn signing_key_count(&self) -> usize {
        self.signers.len()
    }

    /// Accounts already run through `append_signer`.
    pub fn signing_accounts(&self) -> &[String] {
        &self.signing_accounts
    }

    /// The constructed transaction, if any. Never triggers construction.
    pub fn transaction(&self) -> Option<&SignedTransaction> {
        self.tx.as_ref()
    }

    /// The canonical transaction, constructing it first when it is missing
    /// or out of date.
    pub fn json(&mut self) -> BuilderResult<SignedTransaction> {
        if self.tx.is_none() || self.dirty {
            self.construct_tx(None, None)?;
        }
        self.tx
            .clone()
            .ok_or_else(|| BuilderError::MalformedTransaction("transaction not constructed".into()))
    }

    // -----------------------------------------------------------------------
    // Operations and keys
    // -----------------------------------------------------------------------

    /// Append one operation or a list of them, in order.
    pub fn append_ops(&mut self, ops: impl Into<Vec<Operation>>) {
        let ops = ops.into();
        debug!(count = ops.len(), "appending operations");
        self.ops.extend(ops);
        self.dirty = true;
    }

    /// Resolve `account`'s authority for `permission` and collect every
    /// locally held key it leads to. Returns the number of keys added.
    ///
    /// Repeat calls for an account already processed do nothing. When the
    /// requested permission yields no keys, `posting` falls back to
    /// `active`, and anything but `owner` then falls back to `owner`.
    ///
    /// `account` may also be a public key, in which case only that key is
    /// looked up.
    pub fn append_signer(&mut self, account: &str, permission: &str) -> BuilderResult<usize> {
        let permission: Permission = permission.parse()?;
        if self.keys.is_locked() {
            return Err(BuilderError::WalletLocked);
        }
        if self.signing_accounts.iter().any(|a| a == account) {
            debug!(account, "signer already processed");
            return Ok(0);
        }

        let found = match PublicKey::from_prefixed(account, &self.config.key_prefix) {
            Ok(public_key) => vec![self.keys.get_private_key(&public_key).map_err(
                |e| match e {
                    KeyStoreError::Locked => BuilderError::WalletLocked,
                    _ => BuilderError::MissingKey,
                },
            )?],
            Err(_) => self.resolve_with_fallback(account, permission)?,
        };

        let before = self.signers.len();
        self.signers.extend(found);
        self.signing_accounts.push(account.to_string());

        let added = self.signers.len() - before;
        info!(account, %permission, added, total = self.signers.len(), "signer appended");
        Ok(added)
    }

    fn resolve_with_fallback(
        &self,
        account: &str,
        permission: Permission,
    ) -> BuilderResult<Vec<PrivateKey>> {
        let resolver = AuthorityResolver::new(
            self.keys.as_ref(),
            self.authorities.as_ref(),
            &self.config.key_prefix,
        );

        let mut found = resolver.resolve(account, permission)?;
        if found.is_empty() && permission == Permission::Posting {
            debug!(account, "no posting keys, trying active");
            found = resolver.resolve(account, Permission::Active)?;
        }
        if found.is_empty() && permission != Permission::Owner {
            debug!(account, "no keys yet, trying owner");
            found = resolver.resolve(account, Permission::Owner)?;
        }
        Ok(found.into_iter().map(|k| k.private_key).collect())
    }

    /// Add a raw WIF key, bypassing authority resolution.
    pub fn append_wif(&mut self, wif: &str) -> BuilderResult<PublicKey> {
        let key = PrivateKey::from_wif(wif)?;
        let public_key = key.public_key();
        self.signers.insert(key);
        Ok(public_key)
    }

    /// Add an already parsed key.
    pub fn append_key(&mut self, key: PrivateKey) -> bool {
        self.signers.insert(key)
    }

    /// Forget every collected key. Operations are untouched.
    pub fn clear_wifs(&mut self) {
        self.signers.clear();
    }

    // -----------------------------------------------------------------------
    // Construction and signing
    // -----------------------------------------------------------------------

    /// Build the canonical transaction from the current operations.
    ///
    /// Missing block parameters are fetched from the node. Does nothing when
    /// the transaction is already up to date and the parameters are either
    /// omitted or unchanged.
    pub fn construct_tx(
        &mut self,
        ref_block_num: Option<u16>,
        ref_block_prefix: Option<u32>,
    ) -> BuilderResult<&SignedTransaction> {
        let requested = match (ref_block_num, ref_block_prefix) {
            (Some(ref_block_num), Some(ref_block_prefix)) => Some(BlockParams {
                ref_block_num,
                ref_block_prefix,
            }),
            _ => None,
        };

        let up_to_date = match (&self.tx, requested) {
            (Some(tx), Some(params)) => !self.dirty && tx.block_params() == params,
            (Some(_), None) => !self.dirty,
            (None, _) => false,
        };

        if !up_to_date {
            let params = match requested {
                Some(params) => params,
                None => self.transport()?.get_block_params()?,
            };
            let window = chrono::Duration::from_std(self.expiration).map_err(|_| {
                BuilderError::MalformedTransaction("expiration window out of range".into())
            })?;
            let expiration = Utc::now()
                .checked_add_signed(window)
                .ok_or_else(|| {
                    BuilderError::MalformedTransaction("expiration window out of range".into())
                })?
                .format(EXPIRATION_FORMAT)
                .to_string();
            let tx = self.codec.build(params, &expiration, &self.ops)?;
            info!(
                ref_block_num = tx.ref_block_num,
                ref_block_prefix = tx.ref_block_prefix,
                expiration = %tx.expiration,
                operations = tx.operations.len(),
                "transaction constructed"
            );
            self.tx = Some(tx);
            self.dirty = false;
        }

        self.tx
            .as_ref()
            .ok_or_else(|| BuilderError::MalformedTransaction("transaction not constructed".into()))
    }

    /// Sign with every collected key and append the signatures.
    ///
    /// Returns `None` when there is nothing to sign. Reconstructs first when
    /// the transaction was never built, or when operations changed and
    /// `reconstruct` is set. Each call appends: signing twice with the same
    /// keys yields duplicate signatures.
    pub fn sign(&mut self, reconstruct: bool) -> BuilderResult<Option<SignedTransaction>> {
        if self.ops.is_empty() {
            debug!("nothing to sign");
            return Ok(None);
        }
        if self.tx.is_none() || (self.dirty && reconstruct) {
            self.construct_tx(None, None)?;
        }
        if self.signers.is_empty() {
            return Err(BuilderError::MissingKey);
        }

        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| BuilderError::MalformedTransaction("transaction not constructed".into()))?;
        let signatures = self.codec.sign(tx, self.signers.keys())?;
        tx.signatures.extend(signatures.iter().map(hex::encode));

        info!(
            added = signatures.len(),
            total = tx.signatures.len(),
            "transaction signed"
        );
        Ok(Some(tx.clone()))
    }

    // -----------------------------------------------------------------------
    // Node queries
    // -----------------------------------------------------------------------

    fn transport(&self) -> BuilderResult<Arc<dyn RpcTransport>> {
        self.transport.clone().ok_or(BuilderError::OfflineUnavailable)
    }

    /// Ask the node whether the signatures satisfy the required authorities.
    pub fn verify_authority(&mut self) -> BuilderResult<()> {
        let transport = self.transport()?;
        let tx = self.json()?;
        let verdict = transport.verify_authority(&tx)?;
        if authority_verdict(&verdict) {
            Ok(())
        } else {
            warn!(%verdict, "authority verification failed");
            Err(BuilderError::InsufficientAuthority)
        }
    }

    pub fn get_potential_signatures(&mut self) -> BuilderResult<Vec<String>> {
        let transport = self.transport()?;
        let tx = self.json()?;
        Ok(transport.get_potential_signatures(&tx)?)
    }

    pub fn get_required_signatures(&mut self, available_keys: &[String]) -> BuilderResult<Vec<String>> {
        let transport = self.transport()?;
        let tx = self.json()?;
        Ok(transport.get_required_signatures(&tx, available_keys)?)
    }

    pub fn get_transaction_hex(&mut self) -> BuilderResult<String> {
        let transport = self.transport()?;
        let tx = self.json()?;
        Ok(transport.get_transaction_hex(&tx)?)
    }

    // -----------------------------------------------------------------------
    // Broadcast
    // -----------------------------------------------------------------------

    /// Sign if needed, then submit.
    ///
    /// The builder is cleared afterwards whatever the outcome. In dry-run
    /// mode nothing is sent and the would-be transaction is returned.
    pub fn broadcast(&mut self, max_block_age: i64) -> BuilderResult<Option<BroadcastResult>> {
        let result = self.submit(max_block_age);
        if let Err(e) = &result {
            warn!(error = %e, "broadcast failed, discarding transaction");
        }
        self.clear();
        result
    }

    fn submit(&mut self, max_block_age: i64) -> BuilderResult<Option<BroadcastResult>> {
        if self.ops.is_empty() {
            return Ok(None);
        }
        if !self.tx.as_ref().is_some_and(SignedTransaction::is_signed) {
            self.sign(true)?;
        }
        let Some(tx) = self.tx.clone() else {
            return Ok(None);
        };

        if self.config.dry_run {
            info!(operations = tx.operations.len(), "dry run, not broadcasting");
            return Ok(Some(BroadcastResult {
                status: self.status(),
                transaction: tx,
                receipt: None,
            }));
        }

        let transport = self.transport()?;
        let receipt = match self.config.broadcast_mode {
            BroadcastMode::Synchronous => Some(transport.broadcast_transaction_synchronous(&tx)?),
            BroadcastMode::Asynchronous => {
                transport.broadcast_transaction(&tx, max_block_age)?;
                None
            }
        };
        info!(
            mode = ?self.config.broadcast_mode,
            block_num = receipt.as_ref().map(|r| r.block_num),
            "transaction broadcast"
        );

        Ok(Some(BroadcastResult {
            transaction: tx,
            status: TransactionStatus::Broadcast,
            receipt,
        }))
    }

    /// Drop the transaction, operations, keys and signing side channel.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.signers.clear();
        self.signing_accounts.clear();
        self.tx = None;
        self.dirty = false;
        self.signing_info = OfflineSigningRequest::default();
        self.chain = None;
    }
}

/// How a node's `verify_authority` answer is read: a bare boolean, or an
/// object whose `valid` member (when present) decides. Anything empty or
/// falsy (`null`, `0`, `""`) counts as a rejection.
fn authority_verdict(verdict: &Value) -> bool {
    match verdict {
        Value::Bool(valid) => *valid,
        Value::Object(map) => match map.get("valid") {
            Some(valid) => valid.as_bool().unwrap_or(false),
            None => !map.is_empty(),
        },
        Value::Array(items) => !items.is_empty(),
        Value::String(text) => !text.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
    }
}
