//! # Transaction Module
//!
//! Assembly, signing and submission of ledger transactions, plus the side
//! channel that lets several parties sign one transaction offline.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   — Operation, SignedTransaction, BlockParams, status, receipts
//! codec.rs   — TransactionCodec trait and the reference byte codec
//! signers.rs — SigningKeySet: deduplicated keys for one transaction
//! builder.rs — TransactionBuilder state machine
//! offline.rs — OfflineSigningRequest / PendingTransaction hand-off
//! error.rs   — BuilderError
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Append** — operations via `append_ops`, keys via `append_signer`
//!    (authority resolution) or `append_wif`.
//! 2. **Construct** — `construct_tx` fixes block reference and expiration.
//! 3. **Sign** — `sign` appends one signature per collected key.
//! 4. **Broadcast** — `broadcast` submits and resets the builder.
//!
//! ## Design Decisions
//!
//! - Signing appends. Calling `sign` twice without new keys duplicates
//!   signatures; callers that want a fresh set reconstruct first.
//! - Local threshold checks only steer key discovery. Whether a signature
//!   set satisfies an authority is decided by the node.
//! - A broadcast clears the builder on success and on failure alike.

pub mod builder;
pub mod codec;
pub mod error;
pub mod offline;
pub mod signers;
pub mod types;

pub use builder::TransactionBuilder;
pub use codec::{CodecError, ReferenceCodec, TransactionCodec};
pub use error::{BuilderError, BuilderResult};
pub use offline::{ChainParams, OfflineSigningRequest, PendingTransaction};
pub use signers::SigningKeySet;
pub use types::{
    BlockParams, BroadcastResult, Operation, SignedTransaction, TransactionConfirmation,
    TransactionStatus,
};
