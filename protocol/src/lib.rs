// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Quill Protocol — Transaction Preparation Library
//!
//! Quill is the part of a ledger client that turns "alice wants to
//! transfer" into bytes a node will accept: it gathers operations into a
//! canonical transaction, works out which keys must sign it by walking
//! the account's delegated-authority graph, signs, and submits. Every step
//! can also be done offline, with a side channel that lets several
//! disconnected parties add their signatures to one transaction.
//!
//! ## Architecture
//!
//! - **transaction** — The builder state machine, codec, offline hand-off.
//! - **authority** — Permission tiers, authorities, delegate-graph resolver.
//! - **wallet** — Key stores: in-memory and passphrase-encrypted.
//! - **network** — JSON-RPC transport with node failover, and a scripted mock.
//! - **crypto** — Keys (WIF / prefixed public keys), hashing, AEAD.
//! - **config** — Constants and the serde-loadable client/transport config.
//!
//! ## Design Philosophy
//!
//! 1. Collaborators are injected. The builder never reaches for a global
//!    client, so tests swap in memory-backed ones.
//! 2. Soft misses stay soft. A key the wallet lacks is skipped; only an
//!    empty key set at signing time is an error.
//! 3. The node is the judge. Local authority checks guide key discovery
//!    and nothing more.

pub mod authority;
pub mod config;
pub mod crypto;
pub mod network;
pub mod transaction;
pub mod wallet;
