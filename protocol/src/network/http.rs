//! Blocking JSON-RPC over HTTP with node failover.
//!
//! Each node gets `num_retries` attempts; a connection-level failure on the
//! last attempt rotates to the next node in the list. A JSON-RPC error
//! *from* a node is an answer, not a fault, and is returned immediately
//! without failing over. Once every node has been tried the call fails with
//! [`TransportError::RetriesExhausted`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::rpc::{RpcRequest, RpcResponse};
use super::transport::{RpcTransport, TransportError};
use crate::config::TransportConfig;

pub struct HttpTransport {
    client: Client,
    nodes: Vec<String>,
    num_retries: u32,
    current: AtomicUsize,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        if config.nodes.is_empty() {
            return Err(TransportError::NoNodes);
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::Http {
                node: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            nodes: config.nodes.clone(),
            num_retries: config.num_retries.max(1),
            current: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        })
    }

    /// The node the next request will go to.
    pub fn current_node(&self) -> &str {
        &self.nodes[self.current.load(Ordering::Relaxed) % self.nodes.len()]
    }

    fn rotate(&self) {
        let next = (self.current.load(Ordering::Relaxed) + 1) % self.nodes.len();
        self.current.store(next, Ordering::Relaxed);
        warn!(node = %self.nodes[next], "switching to next node");
    }

    fn post(&self, node: &str, request: &RpcRequest) -> Result<RpcResponse, TransportError> {
        let http_err = |e: reqwest::Error| TransportError::Http {
            node: node.to_string(),
            message: e.to_string(),
        };
        self.client
            .post(node)
            .json(request)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(http_err)?
            .json::<RpcResponse>()
            .map_err(http_err)
    }
}

impl RpcTransport for HttpTransport {
    fn call(&self, api: &str, method: &str, params: Value) -> Result<Value, TransportError> {
        let mut attempts = 0;

        for _ in 0..self.nodes.len() {
            let node = self.current_node().to_string();

            for attempt in 1..=self.num_retries {
                attempts += 1;
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let request = RpcRequest::new(id, api, method, params.clone());
                debug!(%node, id, method = %request.method, "rpc request");

                match self.post(&node, &request) {
                    Ok(response) => {
                        return response.into_result().map_err(|e| TransportError::Rpc {
                            code: e.code,
                            message: e.message,
                        })
                    }
                    Err(err) => warn!(%node, attempt, error = %err, "rpc request failed"),
                }
            }

            self.rotate();
        }

        Err(TransportError::RetriesExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(nodes: &[&str]) -> TransportConfig {
        TransportConfig {
            nodes: nodes.iter().map(|s| s.to_string()).collect(),
            num_retries: 2,
            timeout_secs: 2,
        }
    }

    #[test]
    fn requires_at_least_one_node() {
        assert!(matches!(
            HttpTransport::new(&config(&[])),
            Err(TransportError::NoNodes)
        ));
    }

    #[test]
    fn unreachable_nodes_exhaust_retries_and_rotate() {
        let transport =
            HttpTransport::new(&config(&["http://127.0.0.1:1", "http://127.0.0.1:2"])).unwrap();
        assert_eq!(transport.current_node(), "http://127.0.0.1:1");

        let err = transport
            .call("database", "get_dynamic_global_properties", json!({}))
            .unwrap_err();
        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 4 }));
        // Two rotations over two nodes lands back on the first.
        assert_eq!(transport.current_node(), "http://127.0.0.1:1");
    }
}
