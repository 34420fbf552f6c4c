//! Error types for the ledger confirmation subsystem

use shared_types::StateVersion;
use thiserror::Error;

/// Ledger confirmation errors
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// A node submitted transactions before ever submitting its tip.
    ///
    /// Local to that node's submission; never aborts a confirmation tick.
    #[error("Node {node} must submit its ledger tip before submitting transactions")]
    NodeState { node: String },

    /// The candidate extension is not an unbroken +1 chain.
    #[error("Invalid ledger commit: state version {actual} cannot follow {previous}")]
    InvalidLedgerCommit {
        previous: StateVersion,
        actual: StateVersion,
    },

    /// A transaction's declared content does not match its payload.
    #[error("Inconsistent ledger at state version {state_version}: {reason}")]
    InconsistentLedger {
        state_version: StateVersion,
        reason: String,
    },

    /// The persistence collaborator failed.
    #[error("Persistence failure: {reason}")]
    Persistence { reason: String },

    /// No node has reported a tip yet, so no sync target exists.
    #[error("At least one ledger tip must have been submitted")]
    NoTipsSubmitted,

    /// Configuration failed validation.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// The operation was cancelled before completing.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ConfirmationError {
    /// Short label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NodeState { .. } => "node_state",
            Self::InvalidLedgerCommit { .. } => "invalid_ledger_commit",
            Self::InconsistentLedger { .. } => "inconsistent_ledger",
            Self::Persistence { .. } => "persistence",
            Self::NoTipsSubmitted => "no_tips_submitted",
            Self::Config { .. } => "config",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the error aborts the current confirmation tick because the
    /// candidate extension itself is bad.
    pub fn is_consistency_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidLedgerCommit { .. } | Self::InconsistentLedger { .. }
        )
    }
}

/// Result type for ledger confirmation operations
pub type ConfirmationResult<T> = Result<T, ConfirmationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency_failures() {
        assert!(ConfirmationError::InvalidLedgerCommit {
            previous: 1,
            actual: 3
        }
        .is_consistency_failure());
        assert!(ConfirmationError::InconsistentLedger {
            state_version: 2,
            reason: "payload hash mismatch".into()
        }
        .is_consistency_failure());
        assert!(!ConfirmationError::Cancelled.is_consistency_failure());
        assert!(!ConfirmationError::Persistence {
            reason: "db down".into()
        }
        .is_consistency_failure());
    }

    #[test]
    fn test_error_display() {
        let err = ConfirmationError::NodeState {
            node: "node-1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Node node-1 must submit its ledger tip before submitting transactions"
        );
        assert_eq!(err.kind(), "node_state");
    }
}
