//! # Network — Talking to Ledger Nodes
//!
//! ```text
//! rpc.rs       — JSON-RPC 2.0 envelopes, method index
//! transport.rs — RpcTransport trait (one raw call + typed defaults)
//! http.rs      — HttpTransport: blocking reqwest client with node failover
//! mock.rs      — ScriptedTransport: queued replies and a call log
//! ```
//!
//! All calls block the calling thread. Retry and failover live entirely in
//! the transport; the transaction builder never retries on its own.

pub mod http;
pub mod mock;
pub mod rpc;
pub mod transport;

pub use http::HttpTransport;
pub use mock::ScriptedTransport;
pub use rpc::{RpcError, RpcMethod, RpcRequest, RpcResponse};
pub use transport::{RpcTransport, TransportError};
