//! Structured notifications emitted by the confirmation service
//!
//! Every state transition the service goes through is reported as one
//! [`ConfirmationEvent`], delivered synchronously to each registered
//! observer in registration order.

use chrono::{DateTime, Utc};
use shared_types::StateVersion;
use std::time::Duration;

use crate::domain::{NodeTipStatus, QuorumRequirement, QuorumVerdict, TrustThreshold, TrustWeight};
use crate::ports::outbound::CommitReport;

/// Three-valued health status exported as a gauge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricStatus {
    Yes,
    Unknown,
    No,
}

impl MetricStatus {
    pub fn as_gauge_value(self) -> f64 {
        match self {
            MetricStatus::Yes => 1.0,
            MetricStatus::Unknown => 0.5,
            MetricStatus::No => 0.0,
        }
    }
}

impl From<NodeTipStatus> for MetricStatus {
    fn from(status: NodeTipStatus) -> Self {
        match status {
            NodeTipStatus::UpToDate => MetricStatus::Yes,
            NodeTipStatus::OutOfDate => MetricStatus::No,
            NodeTipStatus::Unknown => MetricStatus::Unknown,
        }
    }
}

/// Details of a successful commit.
#[derive(Clone, Debug)]
pub struct CommitSummary {
    pub report: CommitReport,
    /// Wall time of the whole commit call
    pub total_commit_duration: Duration,
    /// How far the committed tip's round timestamp trails the commit time
    pub round_lag: chrono::Duration,
    pub committed_at: DateTime<Utc>,
}

impl CommitSummary {
    pub fn transactions_committed(&self) -> u64 {
        self.report.transactions_committed
    }

    pub fn final_state_version(&self) -> StateVersion {
        self.report.final_transaction.state_version
    }
}

/// A confirmation-service state transition.
#[derive(Clone, Debug)]
pub enum ConfirmationEvent {
    /// Quorum and extension status reset to unknown (service start).
    QuorumReset,

    /// A confirmation tick is starting.
    TickStarted { at: DateTime<Utc> },

    /// The committed tip as read from (or written to) persistence.
    TopOfLedgerRecorded {
        state_version: StateVersion,
        round_timestamp: DateTime<Utc>,
        read_duration: Option<Duration>,
    },

    /// A node reported its tip.
    NodeStatusSubmitted {
        node: String,
        tip_state_version: StateVersion,
        target_state_version: StateVersion,
    },

    /// A node's historical tip was cross-checked against the committed ledger.
    NodeTipChecked {
        node: String,
        tip_state_version: StateVersion,
        status: NodeTipStatus,
    },

    /// The quorum requirement computed for this tick.
    TrustWeightingComputed {
        requirement: QuorumRequirement,
        configured_nodes: usize,
        sufficiently_synced_nodes: usize,
    },

    /// No enabled node carries trust: nothing can ever be committed.
    NoVotersConfigured,

    /// No node is sufficiently synced yet, so the required trust is zero.
    AwaitingSyncedNodes,

    /// A node backed a losing claim at an accepted position.
    NodeReportInconsistent {
        node: String,
        state_version: StateVersion,
    },

    /// A node backed the winning claim at an accepted position.
    NodeReportConsistent {
        node: String,
        state_version: StateVersion,
    },

    /// The walk stopped at a position short of quorum.
    QuorumNotReached {
        state_version: StateVersion,
        best_trust: TrustWeight,
        required_trust_now: TrustThreshold,
        verdict: QuorumVerdict,
    },

    /// At least one position reached quorum this tick.
    QuorumGained {
        transactions: usize,
        final_state_version: StateVersion,
    },

    /// The quorum extension passed validation.
    ExtensionConsistencyGained { transactions: usize },

    /// The quorum extension failed validation.
    ExtensionConsistencyLost { reason: String },

    /// An extension was durably committed.
    LedgerExtensionCommitted(CommitSummary),

    /// Pausing after a large batch.
    BatchDelayEnforced { delay: Duration, transactions: u64 },
}

impl ConfirmationEvent {
    /// Short label for log fields and test assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuorumReset => "quorum_reset",
            Self::TickStarted { .. } => "tick_started",
            Self::TopOfLedgerRecorded { .. } => "top_of_ledger_recorded",
            Self::NodeStatusSubmitted { .. } => "node_status_submitted",
            Self::NodeTipChecked { .. } => "node_tip_checked",
            Self::TrustWeightingComputed { .. } => "trust_weighting_computed",
            Self::NoVotersConfigured => "no_voters_configured",
            Self::AwaitingSyncedNodes => "awaiting_synced_nodes",
            Self::NodeReportInconsistent { .. } => "node_report_inconsistent",
            Self::NodeReportConsistent { .. } => "node_report_consistent",
            Self::QuorumNotReached { .. } => "quorum_not_reached",
            Self::QuorumGained { .. } => "quorum_gained",
            Self::ExtensionConsistencyGained { .. } => "extension_consistency_gained",
            Self::ExtensionConsistencyLost { .. } => "extension_consistency_lost",
            Self::LedgerExtensionCommitted(_) => "ledger_extension_committed",
            Self::BatchDelayEnforced { .. } => "batch_delay_enforced",
        }
    }
}
