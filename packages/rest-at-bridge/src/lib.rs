//! # rest-at-bridge
//!
//! Inbound bridge between REST Atomic Transactions (REST-AT) and local
//! subordinate transaction branches.
//!
//! Every inbound request that carries a REST-AT transaction URL is routed
//! through the [`BridgeRegistry`], which either returns the existing bridge
//! for that transaction or creates one, enlists it with the remote
//! coordinator, and records it. The coordinator later drives
//! prepare/commit/rollback against the bridge's participant URL.
//!
//! ```text
//!   request handler
//!        │ get_or_create(tx_url, base_url)
//!        ▼
//!   BridgeRegistry ──(first access)──► BridgeFactory
//!        │                              ├── BranchManager::allocate
//!        │                              ├── ParticipantIdentity::generate
//!        │                              └── Enlister::enlist ──POST──► coordinator
//!        ▼
//!   tx_url → InboundBridge
//!   participant_id → tx_url
//! ```
//!
//! ## Guarantees
//!
//! - At most one bridge per transaction URL.
//! - At most one transaction URL per participant id.
//! - Concurrent first accesses for one transaction issue a single enlistment.
//!
//! ## Observability
//!
//! The crate emits `tracing` events and never installs a subscriber; the
//! binary does that at startup.

pub mod api;
pub mod bridge;
pub mod config;
pub mod enlistment;
pub mod error;
pub mod identity;

pub use bridge::{BridgeFactory, BridgeRegistry, InboundBridge};
pub use config::ServiceConfig;
pub use enlistment::{Enlister, HttpEnlister};
pub use error::{BranchError, BridgeError, EnlistError, Result};
pub use identity::{BranchId, BranchManager, LocalBranchManager, ParticipantIdentity};
