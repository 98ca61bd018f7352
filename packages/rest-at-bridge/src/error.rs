//! Error types for the inbound bridge.
//!
//! ```text
//! BridgeError
//! ├── IdentifierRequired   - missing transaction URL / base URL / participant id
//! ├── BridgeNotFound       - removal of a transaction that has no bridge
//! ├── Conflict             - a new bridge lost its registration (id collision)
//! ├── BranchAllocation     - transaction manager could not hand out a branch
//! ├── Enlistment           - coordinator rejected or never answered the enlist POST
//! ├── CreationInterrupted  - the runtime shut down before creation finished
//! └── StopFailed           - bridge removed, but releasing its branch failed
//! ```
//!
//! Conflicts seen by [`BridgeRegistry::try_register`](crate::BridgeRegistry::try_register)
//! are reported as `false`, not as an error.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for the bridge registry and its collaborators.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A required identifier was empty or could not be resolved.
    #[error("{0} is required")]
    IdentifierRequired(&'static str),

    /// No bridge is registered for the transaction.
    #[error("No inbound bridge registered for transaction {0}")]
    BridgeNotFound(String),

    /// A freshly created bridge could not be registered.
    #[error("Bridge for transaction {transaction_url} conflicts with an existing registration")]
    Conflict { transaction_url: String },

    /// The transaction manager failed to allocate a branch identifier.
    #[error("Failed to allocate transaction branch: {0}")]
    BranchAllocation(#[from] BranchError),

    /// Enlisting the participant with the coordinator failed.
    #[error("Enlistment failed: {0}")]
    Enlistment(#[from] EnlistError),

    /// The creation task was cancelled by runtime shutdown.
    #[error("Bridge creation for transaction {0} was interrupted")]
    CreationInterrupted(String),

    /// The bridge was unregistered but stopping it failed.
    #[error("Failed to stop bridge for transaction {transaction_url}: {source}")]
    StopFailed {
        transaction_url: String,
        #[source]
        source: BranchError,
    },
}

impl BridgeError {
    /// Whether this error is a caller precondition violation.
    ///
    /// These are raised before any state change or network call and are
    /// never worth retrying.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BridgeError::IdentifierRequired(_) | BridgeError::BridgeNotFound(_)
        )
    }
}

/// Failure reported by the transaction manager for a branch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BranchError {
    /// No more branches can be allocated.
    #[error("branch capacity exhausted ({0} live branches)")]
    Exhausted(usize),

    /// The branch is not (or no longer) known to the transaction manager.
    #[error("unknown branch {0}")]
    UnknownBranch(String),
}

/// Failure of the single enlistment round-trip.
#[derive(Error, Debug)]
pub enum EnlistError {
    /// Coordinator answered with something other than `201 Created`.
    #[error("coordinator responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request did not complete within the configured timeout.
    #[error("enlistment request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure.
    #[error("enlistment request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The transaction URL could not be used as a request target.
    #[error("invalid transaction URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for EnlistError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EnlistError::Timeout
        } else if e.is_builder() {
            EnlistError::InvalidUrl(e.to_string())
        } else {
            EnlistError::Transport(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_required_is_precondition() {
        let err = BridgeError::IdentifierRequired("Participant ID");
        assert!(err.is_precondition());
        assert_eq!(err.to_string(), "Participant ID is required");
    }

    #[test]
    fn test_enlistment_is_not_precondition() {
        let err: BridgeError = EnlistError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }
        .into();
        assert!(!err.is_precondition());
        assert!(matches!(err, BridgeError::Enlistment(EnlistError::Status { .. })));
        assert!(err.to_string().contains("500"));
    }
}
