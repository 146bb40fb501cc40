//! # JSON-RPC Wire Types
//!
//! Request/response envelopes for talking to a ledger node, and the
//! enumeration of the remote methods the transaction layer consumes.
//!
//! Nodes expose their API as `"<api>.<method>"` (appbase style), e.g.
//! `database_api.verify_authority`. API names are normalized so that both
//! `"database"` and `"database_api"` address the same API.
//!
//! ## Method Index
//!
//! | Method                                          | Used by                   |
//! |-------------------------------------------------|---------------------------|
//! | `database_api.get_dynamic_global_properties`    | block-reference lookup    |
//! | `database_api.find_accounts`                    | authority provider        |
//! | `database_api.verify_authority`                 | `verify_authority`        |
//! | `database_api.get_potential_signatures`         | offline bookkeeping       |
//! | `database_api.get_required_signatures`          | offline bookkeeping       |
//! | `database_api.get_transaction_hex`              | debugging / hand-off      |
//! | `network_broadcast_api.broadcast_transaction`   | async broadcast           |
//! | `condenser_api.broadcast_transaction_synchronous` | sync broadcast          |

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// Remote methods the transaction layer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    /// Head block number and id, used to derive ref-block parameters.
    GetDynamicGlobalProperties,
    /// Account records including owner/active/posting authorities.
    FindAccounts,
    /// Remote authority check of a signed transaction.
    VerifyAuthority,
    /// Every key that could possibly sign the transaction.
    GetPotentialSignatures,
    /// The minimal key set, given the keys the caller has.
    GetRequiredSignatures,
    /// Serialized transaction bytes, hex-encoded.
    GetTransactionHex,
    /// Fire-and-forget submission.
    BroadcastTransaction,
    /// Submission that blocks until the transaction is in a block.
    BroadcastTransactionSynchronous,
}

impl RpcMethod {
    /// The API the method belongs to.
    pub fn api(&self) -> &'static str {
        match self {
            Self::GetDynamicGlobalProperties
            | Self::FindAccounts
            | Self::VerifyAuthority
            | Self::GetPotentialSignatures
            | Self::GetRequiredSignatures
            | Self::GetTransactionHex => "database_api",
            Self::BroadcastTransaction => "network_broadcast_api",
            Self::BroadcastTransactionSynchronous => "condenser_api",
        }
    }

    /// The bare method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetDynamicGlobalProperties => "get_dynamic_global_properties",
            Self::FindAccounts => "find_accounts",
            Self::VerifyAuthority => "verify_authority",
            Self::GetPotentialSignatures => "get_potential_signatures",
            Self::GetRequiredSignatures => "get_required_signatures",
            Self::GetTransactionHex => "get_transaction_hex",
            Self::BroadcastTransaction => "broadcast_transaction",
            Self::BroadcastTransactionSynchronous => "broadcast_transaction_synchronous",
        }
    }
}

/// Normalize an API name so it always ends in `_api`.
///
/// `"database"` and `"database_api"` both become `"database_api"`.
pub fn api_name(api: &str) -> String {
    format!("{}_api", api.trim_end_matches("_api"))
}

/// Full wire method name: `"<api>_api.<method>"`.
pub fn wire_method(api: &str, method: &str) -> String {
    format!("{}.{}", api_name(api), method)
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version. Always "2.0".
    pub jsonrpc: String,
    /// Request identifier. Echoed back in the response.
    pub id: u64,
    /// `"<api>.<method>"`.
    pub method: String,
    /// Named (object) or positional (array) parameters.
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: u64, api: &str, method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: wire_method(api, method),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// Exactly one of `result` or `error` should be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Collapse into the result or the node-reported error.
    ///
    /// A response carrying neither is treated as a `null` result; the
    /// caller decides whether an empty answer means anything.
    pub fn into_result(self) -> Result<serde_json::Value, RpcError> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(err),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

// ---------------------------------------------------------------------------
// RPC Errors
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 error object as reported by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data (assertion traces, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_names_are_normalized() {
        assert_eq!(api_name("database"), "database_api");
        assert_eq!(api_name("database_api"), "database_api");
        assert_eq!(
            wire_method("network_broadcast", "broadcast_transaction"),
            "network_broadcast_api.broadcast_transaction"
        );
    }

    #[test]
    fn rpc_request_serialization() {
        let req = RpcRequest::new(7, "database", "verify_authority", json!({ "trx": {} }));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "database_api.verify_authority");
        assert_eq!(value["params"], json!({ "trx": {} }));
    }

    #[test]
    fn response_into_result() {
        let ok: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": { "valid": true } }))
                .unwrap();
        assert_eq!(ok.into_result().unwrap(), json!({ "valid": true }));

        let err: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32603, "message": "boom", "data": { "stack": [] } }
        }))
        .unwrap();
        let err = err.into_result().unwrap_err();
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "boom");
        assert!(err.data.is_some());
    }

    #[test]
    fn response_without_result_or_error_is_null() {
        let raw = r#"{"jsonrpc":"2.0","id":3}"#;
        let resp: RpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.into_result().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn every_method_has_api_and_name() {
        let methods = [
            RpcMethod::GetDynamicGlobalProperties,
            RpcMethod::FindAccounts,
            RpcMethod::VerifyAuthority,
            RpcMethod::GetPotentialSignatures,
            RpcMethod::GetRequiredSignatures,
            RpcMethod::GetTransactionHex,
            RpcMethod::BroadcastTransaction,
            RpcMethod::BroadcastTransactionSynchronous,
        ];
        for m in methods {
            assert!(m.api().ends_with("_api"));
            assert!(!m.name().is_empty());
        }
    }
}
