//! The RPC transport contract.
//!
//! A transport knows how to reach *some* ledger node: which one, how many
//! times to retry and when to fail over are its own business. The
//! transaction layer only needs [`RpcTransport::call`]; every typed method
//! below is a provided default built on top of it, so an implementation (or
//! a test double) only has to answer raw calls.

use serde_json::{json, Value};
use thiserror::Error;

use super::rpc::RpcMethod;
use crate::transaction::types::{BlockParams, SignedTransaction, TransactionConfirmation};

/// Transport-level faults. The builder propagates these unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request to a node failed (connect, timeout, bad status).
    #[error("request to {node} failed: {message}")]
    Http { node: String, message: String },

    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Every node was tried the configured number of times.
    #[error("all nodes failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// No node URLs were configured.
    #[error("no nodes configured")]
    NoNodes,

    /// The node answered, but not with the shape we expected.
    #[error("unexpected response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    fn invalid(method: RpcMethod, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method: method.name().to_string(),
            reason: reason.into(),
        }
    }
}

/// Blocking access to a ledger node.
pub trait RpcTransport {
    /// Execute `<api>.<method>` with the given parameters and return the
    /// `result` member of the response.
    fn call(&self, api: &str, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Convenience wrapper over [`RpcTransport::call`] for known methods.
    fn call_method(&self, method: RpcMethod, params: Value) -> Result<Value, TransportError> {
        self.call(method.api(), method.name(), params)
    }

    fn get_dynamic_global_properties(&self) -> Result<Value, TransportError> {
        self.call_method(RpcMethod::GetDynamicGlobalProperties, json!({}))
    }

    /// Reference-block parameters from the current head block.
    ///
    /// `ref_block_num` is the low 16 bits of the head block number;
    /// `ref_block_prefix` is the little-endian `u32` at byte offset 4 of the
    /// head block id.
    fn get_block_params(&self) -> Result<BlockParams, TransportError> {
        let props = self.get_dynamic_global_properties()?;
        let method = RpcMethod::GetDynamicGlobalProperties;

        let head_block_number = props
            .get("head_block_number")
            .and_then(Value::as_u64)
            .ok_or_else(|| TransportError::invalid(method, "missing head_block_number"))?;
        let head_block_id = props
            .get("head_block_id")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::invalid(method, "missing head_block_id"))?;

        let id_bytes = hex::decode(head_block_id)
            .map_err(|_| TransportError::invalid(method, "head_block_id is not hex"))?;
        let prefix_bytes: [u8; 4] = id_bytes
            .get(4..8)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| TransportError::invalid(method, "head_block_id too short"))?;

        Ok(BlockParams {
            ref_block_num: (head_block_number & 0xFFFF) as u16,
            ref_block_prefix: u32::from_le_bytes(prefix_bytes),
        })
    }

    /// Raw account records for the given names.
    fn find_accounts(&self, names: &[&str]) -> Result<Vec<Value>, TransportError> {
        let ret = self.call_method(RpcMethod::FindAccounts, json!({ "accounts": names }))?;
        let accounts = match ret {
            Value::Object(mut map) => map.remove("accounts").unwrap_or(Value::Null),
            other => other,
        };
        match accounts {
            Value::Array(list) => Ok(list),
            Value::Null => Ok(Vec::new()),
            _ => Err(TransportError::invalid(
                RpcMethod::FindAccounts,
                "accounts is not a list",
            )),
        }
    }

    /// The node's raw verdict; see the builder for how it is interpreted.
    fn verify_authority(&self, tx: &SignedTransaction) -> Result<Value, TransportError> {
        self.call_method(RpcMethod::VerifyAuthority, json!({ "trx": tx }))
    }

    fn get_potential_signatures(&self, tx: &SignedTransaction) -> Result<Vec<String>, TransportError> {
        let ret = self.call_method(RpcMethod::GetPotentialSignatures, json!({ "trx": tx }))?;
        key_list(RpcMethod::GetPotentialSignatures, ret)
    }

    fn get_required_signatures(
        &self,
        tx: &SignedTransaction,
        available_keys: &[String],
    ) -> Result<Vec<String>, TransportError> {
        let ret = self.call_method(
            RpcMethod::GetRequiredSignatures,
            json!({ "trx": tx, "available_keys": available_keys }),
        )?;
        key_list(RpcMethod::GetRequiredSignatures, ret)
    }

    fn get_transaction_hex(&self, tx: &SignedTransaction) -> Result<String, TransportError> {
        let ret = self.call_method(RpcMethod::GetTransactionHex, json!({ "trx": tx }))?;
        let hex = match &ret {
            Value::Object(map) => map.get("hex").and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        };
        hex.map(str::to_string)
            .ok_or_else(|| TransportError::invalid(RpcMethod::GetTransactionHex, "missing hex"))
    }

    fn broadcast_transaction(
        &self,
        tx: &SignedTransaction,
        max_block_age: i64,
    ) -> Result<(), TransportError> {
        self.call_method(
            RpcMethod::BroadcastTransaction,
            json!({ "trx": tx, "max_block_age": max_block_age }),
        )?;
        Ok(())
    }

    /// Blocks until the transaction is included and returns the receipt.
    fn broadcast_transaction_synchronous(
        &self,
        tx: &SignedTransaction,
    ) -> Result<TransactionConfirmation, TransportError> {
        let ret = self.call_method(RpcMethod::BroadcastTransactionSynchronous, json!([tx]))?;
        // Some nodes nest the receipt fields under "trx".
        let receipt = match ret {
            Value::Object(mut map) => match map.remove("trx") {
                Some(Value::Object(inner)) => {
                    map.extend(inner);
                    Value::Object(map)
                }
                Some(other) => {
                    map.insert("trx".to_string(), other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            },
            other => other,
        };
        Ok(serde_json::from_value(receipt)?)
    }
}

fn key_list(method: RpcMethod, ret: Value) -> Result<Vec<String>, TransportError> {
    let keys = match ret {
        Value::Object(mut map) => map.remove("keys").unwrap_or(Value::Null),
        other => other,
    };
    match keys {
        Value::Array(list) => list
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(TransportError::invalid(method, "key is not a string")),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(TransportError::invalid(method, "keys is not a list")),
    }
}
