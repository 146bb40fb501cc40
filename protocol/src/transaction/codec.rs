//! The transaction codec: canonical construction, serialization and
//! signing.
//!
//! The builder treats the codec as a black box with a small contract:
//! given block parameters, an expiration and operations it produces the
//! canonical [`SignedTransaction`]; given a transaction and keys it
//! produces one signature per key. [`ReferenceCodec`] is the
//! implementation shipped with this crate.
//!
//! ## Reference byte layout
//!
//! | Field              | Encoding                                  |
//! |--------------------|-------------------------------------------|
//! | `ref_block_num`    | u16 LE                                    |
//! | `ref_block_prefix` | u32 LE                                    |
//! | `expiration`       | u32 LE, seconds since the Unix epoch      |
//! | `operations`       | u32 LE count, then per operation: tag, fields |
//! | `extensions`       | u32 LE count, then each as canonical JSON |
//!
//! Strings (tags, JSON) are written as a u32 LE length followed by UTF-8
//! bytes. Canonical JSON has object keys sorted at every level and no
//! whitespace. Signatures are never part of the signed bytes.
//!
//! The signing digest is `SHA-256(chain_id ‖ bytes)`, so a signature made
//! for one chain is useless on another. The transaction id is the first 20
//! bytes of `SHA-256(bytes)`, hex-encoded.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::types::{BlockParams, Operation, SignedTransaction};
use crate::config::{DEFAULT_CHAIN_ID, EXPIRATION_FORMAT, SIGNATURE_LENGTH, TRANSACTION_ID_LENGTH};
use crate::crypto::hash::{sha256, sha256_multi};
use crate::crypto::keys::{PrivateKey, PublicKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The transaction fields cannot be serialized.
    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
}

/// Deterministic construction and signing of transactions.
pub trait TransactionCodec {
    /// Assemble the canonical, unsigned transaction.
    fn build(
        &self,
        params: BlockParams,
        expiration: &str,
        operations: &[Operation],
    ) -> Result<SignedTransaction, CodecError>;

    /// One signature per key, in key order. Existing signatures on `tx` are
    /// ignored, not re-signed.
    fn sign(&self, tx: &SignedTransaction, keys: &[PrivateKey]) -> Result<Vec<Vec<u8>>, CodecError>;

    fn transaction_id(&self, tx: &SignedTransaction) -> Result<String, CodecError>;
}

// ---------------------------------------------------------------------------
// ReferenceCodec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCodec {
    chain_id: [u8; 32],
}

impl ReferenceCodec {
    /// `chain_id` is 32 bytes, hex-encoded.
    pub fn new(chain_id: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(chain_id).map_err(|e| CodecError::InvalidChainId(e.to_string()))?;
        let chain_id: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CodecError::InvalidChainId(format!("{} bytes, expected 32", b.len())))?;
        Ok(Self { chain_id })
    }

    pub fn chain_id(&self) -> String {
        hex::encode(self.chain_id)
    }

    /// Signed bytes of `tx`, signatures excluded.
    pub fn serialize(&self, tx: &SignedTransaction) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(128);

        buf.extend_from_slice(&tx.ref_block_num.to_le_bytes());
        buf.extend_from_slice(&tx.ref_block_prefix.to_le_bytes());
        buf.extend_from_slice(&parse_expiration(&tx.expiration)?.to_le_bytes());

        write_len(&mut buf, tx.operations.len())?;
        for op in &tx.operations {
            if op.op_type.is_empty() {
                return Err(CodecError::Malformed("operation with empty type tag".into()));
            }
            write_bytes(&mut buf, op.op_type.as_bytes())?;
            let fields = canonical_json(&Value::Object(op.value.clone()))?;
            write_bytes(&mut buf, &fields)?;
        }

        write_len(&mut buf, tx.extensions.len())?;
        for ext in &tx.extensions {
            write_bytes(&mut buf, &canonical_json(ext)?)?;
        }

        Ok(buf)
    }

    /// The 32-byte message every signature covers.
    pub fn digest(&self, tx: &SignedTransaction) -> Result<[u8; 32], CodecError> {
        let bytes = self.serialize(tx)?;
        Ok(sha256_multi(&[&self.chain_id, &bytes]))
    }

    /// Whether `signature` (hex) is a valid signature of `tx` by `public_key`.
    pub fn verify(
        &self,
        tx: &SignedTransaction,
        public_key: &PublicKey,
        signature: &str,
    ) -> Result<bool, CodecError> {
        let digest = self.digest(tx)?;
        let Ok(sig) = hex::decode(signature) else {
            return Ok(false);
        };
        if sig.len() != SIGNATURE_LENGTH {
            return Ok(false);
        }
        Ok(public_key.verify(&digest, &sig))
    }
}

impl Default for ReferenceCodec {
    fn default() -> Self {
        Self {
            chain_id: hex::decode(DEFAULT_CHAIN_ID)
                .ok()
                .and_then(|b| b.try_into().ok())
                .unwrap_or([0u8; 32]),
        }
    }
}

impl TransactionCodec for ReferenceCodec {
    fn build(
        &self,
        params: BlockParams,
        expiration: &str,
        operations: &[Operation],
    ) -> Result<SignedTransaction, CodecError> {
        let tx = SignedTransaction {
            ref_block_num: params.ref_block_num,
            ref_block_prefix: params.ref_block_prefix,
            expiration: expiration.to_string(),
            operations: operations.to_vec(),
            extensions: Vec::new(),
            signatures: Vec::new(),
        };
        // Reject now rather than at signing time.
        self.serialize(&tx)?;
        Ok(tx)
    }

    fn sign(&self, tx: &SignedTransaction, keys: &[PrivateKey]) -> Result<Vec<Vec<u8>>, CodecError> {
        let digest = self.digest(tx)?;
        Ok(keys.iter().map(|key| key.sign(&digest).to_vec()).collect())
    }

    fn transaction_id(&self, tx: &SignedTransaction) -> Result<String, CodecError> {
        let bytes = self.serialize(tx)?;
        Ok(hex::encode(&sha256(&bytes)[..TRANSACTION_ID_LENGTH]))
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn parse_expiration(expiration: &str) -> Result<u32, CodecError> {
    let at = NaiveDateTime::parse_from_str(expiration, EXPIRATION_FORMAT)
        .map_err(|e| CodecError::Malformed(format!("expiration {:?}: {}", expiration, e)))?;
    u32::try_from(at.and_utc().timestamp())
        .map_err(|_| CodecError::Malformed(format!("expiration {:?} out of range", expiration)))
}

fn write_len(buf: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::Malformed("field too long".into()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), CodecError> {
    write_len(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Compact JSON with object keys sorted at every level, regardless of how
/// the map type orders them.
fn canonical_json(value: &Value) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&Canonical(value)).map_err(|e| CodecError::Malformed(e.to_string()))
}

struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let sorted: BTreeMap<&String, &Value> = map.iter().collect();
                let mut out = serializer.serialize_map(Some(sorted.len()))?;
                for (k, v) in sorted {
                    out.serialize_entry(k, &Canonical(v))?;
                }
                out.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            other => other.serialize(serializer),
        }
    }
}
