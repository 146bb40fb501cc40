//! Core value types for transactions: operations, the canonical transaction
//! envelope, lifecycle status, block-reference parameters and broadcast
//! receipts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A ledger-defined action, opaque to the builder.
///
/// On the wire an operation is a two-element array: the type tag and the
/// operation's field map, e.g. `["transfer", {"from": "alice", ...}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub op_type: String,
    pub value: Map<String, Value>,
}

impl Operation {
    pub fn new(op_type: impl Into<String>, value: Map<String, Value>) -> Self {
        Self {
            op_type: op_type.into(),
            value,
        }
    }

    /// Build from a JSON value that must be an object. Anything else gets an
    /// empty field map, which the codec will still accept; use
    /// [`Operation::new`] when the fields are already a map.
    pub fn from_json(op_type: impl Into<String>, value: Value) -> Self {
        let value = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(op_type, value)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.op_type, &self.value).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (op_type, value) = <(String, Map<String, Value>)>::deserialize(deserializer)?;
        Ok(Self { op_type, value })
    }
}

/// One operation or many, for `append_ops`.
impl From<Operation> for Vec<Operation> {
    fn from(op: Operation) -> Self {
        vec![op]
    }
}

// ---------------------------------------------------------------------------
// SignedTransaction
// ---------------------------------------------------------------------------

/// The canonical transaction object exchanged with the codec and transport.
///
/// ```text
/// { ref_block_num, ref_block_prefix, expiration, operations, extensions, signatures }
/// ```
///
/// "Signed" names the shape, not the state: `signatures` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    /// UTC, `%Y-%m-%dT%H:%M:%S`.
    pub expiration: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub extensions: Vec<Value>,
    /// Hex-encoded signatures in the order they were produced.
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl SignedTransaction {
    pub fn block_params(&self) -> BlockParams {
        BlockParams {
            ref_block_num: self.ref_block_num,
            ref_block_prefix: self.ref_block_prefix,
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BlockParams
// ---------------------------------------------------------------------------

/// Reference to a recent block, binding a transaction to one chain history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockParams {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
}

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Where the builder's in-progress transaction is in its lifecycle.
///
/// ```text
/// Empty ──append_ops──▶ Dirty ──construct──▶ Constructed ──sign──▶ Signed ──broadcast──▶ Broadcast
///                         ▲                       │                   │
///                         └──────append_ops───────┴───────────────────┘
/// ```
///
/// After a broadcast (successful or not) the builder itself resets to
/// `Empty`; `Broadcast` is only ever reported on the returned result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// No operations.
    Empty,
    /// Operations changed since the last construction (or never constructed).
    Dirty,
    /// Canonical object built, no signatures yet.
    Constructed,
    /// At least one signing pass has run.
    Signed,
    /// Submitted to the network.
    Broadcast,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Dirty => write!(f, "Dirty"),
            Self::Constructed => write!(f, "Constructed"),
            Self::Signed => write!(f, "Signed"),
            Self::Broadcast => write!(f, "Broadcast"),
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Inclusion receipt returned by a synchronous broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfirmation {
    pub id: String,
    pub block_num: u32,
    pub trx_num: u32,
    pub expired: bool,
}

/// What `broadcast` hands back once the builder has cleared itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    #[serde(flatten)]
    pub transaction: SignedTransaction,
    /// `Broadcast` after submission; `Signed` (or `Constructed`) for a dry run.
    pub status: TransactionStatus,
    /// Present only for synchronous broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TransactionConfirmation>,
}
