//! Subcommand implementations.
//!
//! Every command returns the JSON it wants printed; `main` decides where it
//! goes. Nothing here writes to stdout directly.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use quill_protocol::authority::{MemoryAuthorities, RpcAuthorityProvider};
use quill_protocol::config::{BroadcastMode, ClientConfig};
use quill_protocol::crypto::{PrivateKey, PublicKey};
use quill_protocol::network::{HttpTransport, RpcTransport};
use quill_protocol::transaction::{
    PendingTransaction, ReferenceCodec, TransactionBuilder, TransactionCodec,
};
use quill_protocol::wallet::{EncryptedKeyStore, KeyStore, MemoryKeyStore, SealedWallet};

use crate::cli::{BroadcastArgs, InspectArgs, KeygenArgs, SignArgs};
use crate::config::SignerConfig;

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

pub fn read_pending(path: &Path) -> Result<PendingTransaction> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    PendingTransaction::from_json(&raw)
        .with_context(|| format!("{} is not a pending transaction", path.display()))
}

/// WIFs from the command line followed by those in `key_file`, one per
/// line. Blank lines and `#` comments are ignored.
fn collect_wifs(inline: &[String], key_file: Option<&Path>) -> Result<Vec<String>> {
    let mut wifs = inline.to_vec();
    if let Some(path) = key_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?;
        wifs.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    Ok(wifs)
}

fn open_wallet(path: &Path, passphrase: &str) -> Result<EncryptedKeyStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read wallet {}", path.display()))?;
    let sealed: SealedWallet = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a sealed wallet", path.display()))?;
    let store = EncryptedKeyStore::import(&sealed).context("corrupt wallet")?;
    store.unlock(passphrase).context("failed to unlock wallet")?;
    info!(keys = store.len(), "wallet unlocked");
    Ok(store)
}

/// The client settings to sign a pending transaction with.
///
/// A pending transaction that records its chain wins over the configured
/// one, so signatures always commit to the chain the transaction was
/// prepared for.
fn client_for(pending: &PendingTransaction, config: &ClientConfig) -> ClientConfig {
    let mut client = config.clone();
    if let Some(chain) = &pending.blockchain {
        if chain.chain_id != client.chain_id || chain.prefix != client.key_prefix {
            info!(
                chain_id = %chain.chain_id,
                prefix = %chain.prefix,
                "using chain recorded in pending transaction"
            );
        }
        client.chain_id = chain.chain_id.clone();
        client.key_prefix = chain.prefix.clone();
    }
    client
}

fn builder_for(
    keys: Arc<dyn KeyStore>,
    pending: &PendingTransaction,
    config: &ClientConfig,
) -> Result<TransactionBuilder> {
    let client = client_for(pending, config);
    let codec = ReferenceCodec::new(&client.chain_id).context("invalid chain id")?;
    Ok(TransactionBuilder::new(
        keys,
        Arc::new(MemoryAuthorities::new()),
        Arc::new(codec),
        client,
    ))
}

// ---------------------------------------------------------------------------
// keygen
// ---------------------------------------------------------------------------

/// Generate a key. Without `--wallet` the WIF is printed; with it the key
/// is sealed into the wallet file (created on first use) and only the
/// public key is printed.
pub fn keygen(args: &KeygenArgs, config: &SignerConfig) -> Result<Value> {
    let prefix = args.prefix.as_deref().unwrap_or(&config.client.key_prefix);
    let key = PrivateKey::generate();
    let public_key = key.public_key().to_prefixed(prefix);
    info!(%public_key, "key generated");

    let Some(path) = &args.wallet else {
        return Ok(json!({
            "wif": key.to_wif(),
            "public_key": public_key,
        }));
    };

    let passphrase = args
        .passphrase
        .as_deref()
        .context("--wallet needs a passphrase (set QUILL_WALLET_PASSPHRASE)")?;
    let store = if path.exists() {
        open_wallet(path, passphrase)?
    } else {
        info!(path = %path.display(), "creating wallet");
        EncryptedKeyStore::create(passphrase).context("failed to create wallet")?
    };
    store.add_key(&key).context("failed to seal key")?;
    let sealed = serde_json::to_string_pretty(&store.export())?;
    std::fs::write(path, sealed)
        .with_context(|| format!("failed to write wallet {}", path.display()))?;

    Ok(json!({
        "public_key": public_key,
        "wallet": path.display().to_string(),
        "keys": store.len(),
    }))
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

/// Summarize a pending transaction: its id, operations, and which of the
/// listed keys have already signed.
pub fn inspect(args: &InspectArgs, config: &SignerConfig) -> Result<Value> {
    let pending = read_pending(&args.file)?;
    let client = client_for(&pending, &config.client);
    let codec = ReferenceCodec::new(&client.chain_id).context("invalid chain id")?;
    let tx = &pending.transaction;

    let (signed, outstanding): (Vec<&String>, Vec<&String>) =
        pending.signing.missing_signatures.iter().partition(|text| {
            PublicKey::from_prefixed(text, &client.key_prefix)
                .map(|pk| {
                    tx.signatures
                        .iter()
                        .any(|sig| codec.verify(tx, &pk, sig).unwrap_or(false))
                })
                .unwrap_or(false)
        });

    let mut builder = builder_for(Arc::new(MemoryKeyStore::new()), &pending, &config.client)?;
    builder.load_pending(pending.clone());

    Ok(json!({
        "id": codec.transaction_id(tx).context("failed to compute transaction id")?,
        "status": builder.status().to_string(),
        "expiration": tx.expiration,
        "operations": tx.operations.iter().map(|op| op.op_type.as_str()).collect::<Vec<_>>(),
        "signatures": tx.signatures.len(),
        "required_authorities": pending.signing.required_authorities.keys().collect::<Vec<_>>(),
        "signed_by": signed,
        "outstanding": outstanding,
        "chain_id": client.chain_id,
    }))
}

// ---------------------------------------------------------------------------
// sign
// ---------------------------------------------------------------------------

/// Add local signatures to a pending transaction without touching the
/// network.
///
/// With a wallet, only keys listed in `missing_signatures` can be found.
/// With plain WIFs every supplied key signs, listed or not.
pub fn sign(args: &SignArgs, config: &SignerConfig) -> Result<PendingTransaction> {
    let pending = read_pending(&args.file)?;
    if pending.transaction.operations.is_empty() {
        bail!("{} has no operations to sign", args.file.display());
    }

    let (keys, wifs): (Arc<dyn KeyStore>, Vec<String>) = match &args.wallet {
        Some(path) => {
            let passphrase = args
                .passphrase
                .as_deref()
                .context("--wallet needs a passphrase (set QUILL_WALLET_PASSPHRASE)")?;
            let store: Arc<dyn KeyStore> = Arc::new(open_wallet(path, passphrase)?);
            (store, Vec::new())
        }
        None => {
            let wifs = collect_wifs(&args.wifs, args.key_file.as_deref())?;
            if wifs.is_empty() {
                bail!("no signing keys given: pass --wif, --key-file or --wallet");
            }
            let store: Arc<dyn KeyStore> =
                Arc::new(MemoryKeyStore::from_wifs(&wifs).context("invalid private key")?);
            (store, wifs)
        }
    };

    let mut builder = builder_for(keys, &pending, &config.client)?;
    let before = pending.transaction.signatures.len();
    builder.load_pending(pending);

    let listed = builder.append_missing_signatures()?;
    for wif in &wifs {
        builder.append_wif(wif)?;
    }
    if builder.signing_key_count() == 0 {
        bail!("none of the available keys are listed as missing signatures");
    }
    info!(listed, keys = builder.signing_key_count(), "signing");

    builder.sign(false)?;
    let signed = builder.to_pending()?;
    info!(
        added = signed.transaction.signatures.len() - before,
        total = signed.transaction.signatures.len(),
        "pending transaction signed"
    );
    Ok(signed)
}

// ---------------------------------------------------------------------------
// broadcast
// ---------------------------------------------------------------------------

pub fn broadcast(args: &BroadcastArgs, config: &SignerConfig) -> Result<Value> {
    let pending = read_pending(&args.file)?;
    if !pending.transaction.is_signed() {
        bail!("{} carries no signatures; run `sign` first", args.file.display());
    }

    let mut transport_config = config.transport.clone();
    if !args.nodes.is_empty() {
        transport_config.nodes = args.nodes.clone();
    }
    let transport: Arc<dyn RpcTransport> =
        Arc::new(HttpTransport::new(&transport_config).context("cannot reach any node")?);

    let mut client = client_for(&pending, &config.client);
    client.dry_run |= args.dry_run;
    if args.asynchronous {
        client.broadcast_mode = BroadcastMode::Asynchronous;
    }
    let codec = ReferenceCodec::new(&client.chain_id).context("invalid chain id")?;

    let mut builder = TransactionBuilder::new(
        Arc::new(MemoryKeyStore::new()),
        Arc::new(RpcAuthorityProvider::new(transport.clone())),
        Arc::new(codec),
        client,
    )
    .with_transport(transport);
    builder.load_pending(pending);

    if args.verify {
        builder
            .verify_authority()
            .context("node rejected the transaction's signatures")?;
        info!("authority verified");
    }

    match builder.broadcast(args.max_block_age)? {
        Some(result) => Ok(serde_json::to_value(result)?),
        None => {
            warn!("nothing was broadcast");
            Ok(Value::Null)
        }
    }
}
