//! Construction and enlistment of new inbound bridges.

use std::sync::Arc;

use crate::enlistment::Enlister;
use crate::error::Result;
use crate::identity::{BranchManager, ParticipantIdentity, BRIDGE_BRANCH_FORMAT_ID};

use super::InboundBridge;

/// Builds bridges: allocates the branch, mints the participant id and
/// enlists the participant URL with the coordinator.
///
/// Nothing here touches registry state; a bridge only becomes visible once
/// the registry inserts it.
#[derive(Clone)]
pub struct BridgeFactory {
    branches: Arc<dyn BranchManager>,
    enlister: Arc<dyn Enlister>,
    participant_segment: String,
}

impl BridgeFactory {
    pub fn new(
        branches: Arc<dyn BranchManager>,
        enlister: Arc<dyn Enlister>,
        participant_segment: impl Into<String>,
    ) -> Self {
        Self {
            branches,
            enlister,
            participant_segment: participant_segment.into(),
        }
    }

    /// The transaction manager bridges are stopped against.
    pub fn branches(&self) -> &dyn BranchManager {
        self.branches.as_ref()
    }

    pub fn participant_segment(&self) -> &str {
        &self.participant_segment
    }

    /// `{base_url}/{segment}/{participant_id}`, with exactly one separator
    /// after the base URL.
    pub fn participant_url(&self, base_url: &str, participant_id: &str) -> String {
        let mut url = base_url.to_string();
        if !url.ends_with('/') {
            url.push('/');
        }
        format!("{}{}/{}", url, self.participant_segment, participant_id)
    }

    /// Create and enlist a bridge for `transaction_url`.
    ///
    /// On enlistment failure the freshly allocated branch is released again,
    /// so a failed creation leaves nothing behind.
    pub async fn create(&self, transaction_url: &str, base_url: &str) -> Result<InboundBridge> {
        let branch_id = self
            .branches
            .allocate(ParticipantIdentity::unique_token(), BRIDGE_BRANCH_FORMAT_ID)?;

        let participant_id = ParticipantIdentity::generate();
        let participant_url = self.participant_url(base_url, &participant_id);

        if let Err(e) = self.enlister.enlist(&participant_url, transaction_url).await {
            if let Err(release_err) = self.branches.release(&branch_id) {
                tracing::warn!(
                    branch = %branch_id,
                    error = %release_err,
                    "[Bridge] Failed to release branch after enlistment failure"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            transaction_url = transaction_url,
            participant_url = participant_url.as_str(),
            branch = %branch_id,
            "[Bridge] Created inbound bridge"
        );

        Ok(InboundBridge::new(
            branch_id,
            transaction_url.to_string(),
            participant_id,
        ))
    }
}
