//! Identifiers handed out when a bridge is created.
//!
//! Two kinds of identity are involved:
//!
//! - **Branch ids** identify the local subordinate branch to the transaction
//!   manager. They are allocated through the [`BranchManager`] seam so the
//!   registry never depends on how the transaction manager represents them.
//! - **Participant ids** are what the bridge registers with the remote
//!   coordinator. They carry a fixed type marker so recovery scans can tell
//!   bridge participants apart from anything else by prefix alone.

use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BranchError;

/// Format id stamped on every bridge branch.
pub const BRIDGE_BRANCH_FORMAT_ID: i32 = 131080;

/// Type marker prefixed to every bridge participant id.
pub const PARTICIPANT_TYPE_MARKER: &str = "RestAtBridgeDurableParticipant:";

// ── Branch Identifiers ───────────────────────────────────────────────────────

/// Xid-shaped identifier of a subordinate transaction branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchId {
    pub format_id: i32,
    #[serde(with = "hex_bytes")]
    pub global_id: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub branch_qualifier: Vec<u8>,
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.format_id,
            hex::encode(&self.global_id),
            hex::encode(&self.branch_qualifier)
        )
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Transaction-manager collaborator that owns subordinate branches.
pub trait BranchManager: Send + Sync {
    /// Allocate a fresh branch for `token` under `format_id`.
    fn allocate(&self, token: Uuid, format_id: i32) -> Result<BranchId, BranchError>;

    /// Release everything tied to `branch`. Backs `InboundBridge::stop`.
    fn release(&self, branch: &BranchId) -> Result<(), BranchError>;
}

/// In-process branch manager.
///
/// Tracks live branches so a double release is reported instead of ignored.
/// An optional capacity models resource exhaustion; the capacity check and
/// the insert happen under one lock.
#[derive(Debug, Default)]
pub struct LocalBranchManager {
    live: Mutex<HashSet<BranchId>>,
    capacity: Option<usize>,
}

impl LocalBranchManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager that refuses to hold more than `capacity` live branches.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            live: Mutex::new(HashSet::new()),
            capacity: Some(capacity),
        }
    }

    /// Number of branches allocated and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, branch: &BranchId) -> bool {
        self.live.lock().contains(branch)
    }
}

impl BranchManager for LocalBranchManager {
    fn allocate(&self, token: Uuid, format_id: i32) -> Result<BranchId, BranchError> {
        let branch = BranchId {
            format_id,
            global_id: token.as_bytes().to_vec(),
            branch_qualifier: Uuid::new_v4().as_bytes().to_vec(),
        };

        {
            let mut live = self.live.lock();
            if let Some(capacity) = self.capacity {
                if live.len() >= capacity {
                    return Err(BranchError::Exhausted(capacity));
                }
            }
            live.insert(branch.clone());
        }
        tracing::debug!(branch = %branch, "[Branch] Allocated subordinate branch");
        Ok(branch)
    }

    fn release(&self, branch: &BranchId) -> Result<(), BranchError> {
        if !self.live.lock().remove(branch) {
            return Err(BranchError::UnknownBranch(branch.to_string()));
        }
        tracing::debug!(branch = %branch, "[Branch] Released subordinate branch");
        Ok(())
    }
}

// ── Participant Identifiers ──────────────────────────────────────────────────

/// Generator and recognizer for bridge participant ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipantIdentity;

impl ParticipantIdentity {
    /// A fresh unique token, shared source for branch and participant ids.
    pub fn unique_token() -> Uuid {
        Uuid::new_v4()
    }

    /// A fresh participant id: type marker followed by a unique token.
    pub fn generate() -> String {
        format!(
            "{}{}",
            PARTICIPANT_TYPE_MARKER,
            Self::unique_token().simple()
        )
    }

    /// Whether `participant_id` was minted for a bridge participant.
    pub fn is_bridge_participant(participant_id: &str) -> bool {
        participant_id
            .strip_prefix(PARTICIPANT_TYPE_MARKER)
            .is_some_and(|token| !token.is_empty())
    }
}
