//! Enlistment of bridge participants with a remote REST-AT coordinator.
//!
//! Enlistment is a single `POST` to the transaction URL carrying the
//! participant's terminator and recovery URLs. Only `201 Created` counts as
//! success. There is no retry at this layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::EnlistError;

/// Link name for the URL the coordinator drives prepare/commit/rollback on.
pub const PARTICIPANT_TERMINATOR_LINK: &str = "participant-terminator";

/// Link name for the URL the coordinator uses during recovery.
pub const PARTICIPANT_RESOURCE_LINK: &str = "participant-resource";

/// Registers participant URLs with a remote coordinator.
#[async_trait]
pub trait Enlister: Send + Sync {
    /// Enlist `participant_url` in the transaction at `transaction_url`.
    async fn enlist(&self, participant_url: &str, transaction_url: &str)
        -> Result<(), EnlistError>;
}

/// Form fields posted to the coordinator.
///
/// Both links point at the same participant URL.
pub fn participant_links(participant_url: &str) -> [(&'static str, &str); 2] {
    [
        (PARTICIPANT_TERMINATOR_LINK, participant_url),
        (PARTICIPANT_RESOURCE_LINK, participant_url),
    ]
}

/// [`Enlister`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpEnlister {
    client: Client,
    timeout: Duration,
}

impl HttpEnlister {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(Client::new(), timeout)
    }

    /// Reuse an existing client (shared connection pool).
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Enlister for HttpEnlister {
    async fn enlist(
        &self,
        participant_url: &str,
        transaction_url: &str,
    ) -> Result<(), EnlistError> {
        tracing::debug!(
            transaction_url = transaction_url,
            participant_url = participant_url,
            "[Enlist] Enlisting participant"
        );

        let response = self
            .client
            .post(transaction_url)
            .timeout(self.timeout)
            .form(&participant_links(participant_url))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            tracing::info!(
                transaction_url = transaction_url,
                participant_url = participant_url,
                "[Enlist] Participant enlisted"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            transaction_url = transaction_url,
            status = %status,
            "[Enlist] Coordinator rejected enlistment"
        );
        Err(EnlistError::Status { status, body })
    }
}
