//! Inbound bridges between remote REST-AT transactions and local branches.
//!
//! An [`InboundBridge`] stands in for one remote transaction inside the local
//! transaction manager. Bridges are created by the [`BridgeFactory`], which
//! enlists them with the coordinator, and owned by the [`BridgeRegistry`]
//! until they are removed.
//!
//! ## Invariants
//!
//! The registry keeps two indices in step:
//!
//! - transaction URL → bridge
//! - participant id → transaction URL
//!
//! Every bridge is reachable through both, at most one bridge exists per
//! transaction, and a participant id belongs to at most one transaction.

pub mod factory;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::identity::{BranchId, BranchManager};

pub use factory::BridgeFactory;
pub use registry::BridgeRegistry;

/// Local stand-in for a remote REST-AT transaction.
///
/// The three identifiers never change after construction; two bridges are
/// the same bridge iff all three match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundBridge {
    branch_id: BranchId,
    transaction_url: String,
    participant_id: String,
}

impl InboundBridge {
    pub fn new(branch_id: BranchId, transaction_url: String, participant_id: String) -> Self {
        Self {
            branch_id,
            transaction_url,
            participant_id,
        }
    }

    pub fn branch_id(&self) -> &BranchId {
        &self.branch_id
    }

    pub fn transaction_url(&self) -> &str {
        &self.transaction_url
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Release the subordinate branch held by this bridge.
    pub fn stop(&self, branches: &dyn BranchManager) -> Result<()> {
        branches
            .release(&self.branch_id)
            .map_err(|source| BridgeError::StopFailed {
                transaction_url: self.transaction_url.clone(),
                source,
            })?;
        tracing::info!(
            transaction_url = self.transaction_url.as_str(),
            participant_id = self.participant_id.as_str(),
            "[Bridge] Bridge stopped"
        );
        Ok(())
    }
}
