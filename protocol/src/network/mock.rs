//! A scripted, in-process [`RpcTransport`].
//!
//! Replies are queued per method. The last queued reply for a method is
//! sticky: it keeps being returned once the queue is down to one entry.
//! Every call is recorded so tests can assert on what reached the "node".

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::rpc::{wire_method, RpcMethod};
use super::transport::{RpcTransport, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Rpc { code: i64, message: String },
    Http(String),
}

impl Reply {
    fn materialize(self) -> Result<Value, TransportError> {
        match self {
            Reply::Value(v) => Ok(v),
            Reply::Rpc { code, message } => Err(TransportError::Rpc { code, message }),
            Reply::Http(message) => Err(TransportError::Http {
                node: "scripted".to_string(),
                message,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: RpcMethod, reply: Reply) {
        self.replies
            .lock()
            .entry(wire_method(method.api(), method.name()))
            .or_default()
            .push_back(reply);
    }

    /// Queue a successful result for `method`.
    pub fn respond(&self, method: RpcMethod, result: Value) {
        self.push(method, Reply::Value(result));
    }

    /// Queue a node-reported JSON-RPC error for `method`.
    pub fn fail(&self, method: RpcMethod, code: i64, message: &str) {
        self.push(
            method,
            Reply::Rpc {
                code,
                message: message.to_string(),
            },
        );
    }

    /// Queue a connection-level failure for `method`.
    pub fn fail_http(&self, method: RpcMethod, message: &str) {
        self.push(method, Reply::Http(message.to_string()));
    }

    /// Answer block-parameter lookups with the given head block.
    pub fn with_head_block(&self, number: u64, prefix: u32) {
        let mut id = [0u8; 20];
        id[..4].copy_from_slice(&(number as u32).to_be_bytes());
        id[4..8].copy_from_slice(&prefix.to_le_bytes());
        self.respond(
            RpcMethod::GetDynamicGlobalProperties,
            json!({
                "head_block_number": number,
                "head_block_id": hex::encode(id),
            }),
        );
    }

    /// Every call made so far, as `(wire method, params)`.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Number of calls made to `method`.
    pub fn calls_to(&self, method: RpcMethod) -> usize {
        let wire = wire_method(method.api(), method.name());
        self.calls.lock().iter().filter(|(m, _)| *m == wire).count()
    }
}

impl RpcTransport for ScriptedTransport {
    fn call(&self, api: &str, method: &str, params: Value) -> Result<Value, TransportError> {
        let wire = wire_method(api, method);
        self.calls.lock().push((wire.clone(), params));

        let mut replies = self.replies.lock();
        let queue = replies.get_mut(&wire).filter(|q| !q.is_empty());
        let reply = match queue {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().cloned(),
            None => None,
        };

        reply
            .map(Reply::materialize)
            .unwrap_or_else(|| {
                Err(TransportError::Rpc {
                    code: -32601,
                    message: format!("method not found: {}", wire),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_reply_is_sticky() {
        let t = ScriptedTransport::new();
        t.respond(RpcMethod::VerifyAuthority, json!(false));
        t.respond(RpcMethod::VerifyAuthority, json!(true));

        let call = || t.call_method(RpcMethod::VerifyAuthority, json!({})).unwrap();
        assert_eq!(call(), json!(false));
        assert_eq!(call(), json!(true));
        assert_eq!(call(), json!(true));
        assert_eq!(t.calls_to(RpcMethod::VerifyAuthority), 3);
    }

    #[test]
    fn unscripted_method_is_not_found() {
        let t = ScriptedTransport::new();
        let err = t.call("database", "nope", json!({})).unwrap_err();
        assert!(matches!(err, TransportError::Rpc { code: -32601, .. }));
    }

    #[test]
    fn failures_surface_as_transport_errors() {
        let t = ScriptedTransport::new();
        t.fail_http(RpcMethod::BroadcastTransaction, "connection reset");
        let err = t
            .call_method(RpcMethod::BroadcastTransaction, json!({}))
            .unwrap_err();
        assert!(matches!(err, TransportError::Http { .. }));
    }
}
