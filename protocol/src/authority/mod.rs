//! # Authority — Who Must Sign
//!
//! ```text
//! types.rs    — Permission tiers, Authority, AccountAuthorities
//! provider.rs — AuthorityProvider trait, in-memory and RPC-backed lookups
//! resolver.rs — delegate-graph walk that collects locally held keys
//! ```
//!
//! Resolution is best-effort: the resolver gathers keys that plausibly
//! satisfy an authority. It never refuses because a threshold is not met
//! locally, since only the ledger can adjudicate that.

pub mod provider;
pub mod resolver;
pub mod types;

pub use provider::{AuthorityError, AuthorityProvider, MemoryAuthorities, RpcAuthorityProvider};
pub use resolver::{AuthorityResolver, ResolvedKey};
pub use types::{AccountAuthorities, Authority, Permission};
