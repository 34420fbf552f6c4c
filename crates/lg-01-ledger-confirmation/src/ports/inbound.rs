//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::{CommittedTransaction, Hash, StateVersion, TransactionSummary};
use tokio_util::sync::CancellationToken;

use crate::domain::TransactionsRequested;
use crate::error::ConfirmationResult;
use crate::events::CommitSummary;

/// What one confirmation tick did.
#[derive(Clone, Debug)]
pub enum TickOutcome {
    /// No enabled node carries trust
    NoVotersConfigured,
    /// No node is sufficiently synced yet
    AwaitingSyncedNodes,
    /// The walk stopped at `state_version` without committing anything
    NoQuorum { state_version: StateVersion },
    /// The walk accepted nothing and did not stop at any position
    NothingToCommit,
    /// An extension was committed
    Committed(CommitSummary),
}

impl TickOutcome {
    /// Label for the worker loop outcome counter.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoVotersConfigured => "no_voters_configured",
            Self::AwaitingSyncedNodes => "awaiting_synced_nodes",
            Self::NoQuorum { .. } => "no_quorum",
            Self::NothingToCommit => "nothing_to_commit",
            Self::Committed(_) => "committed",
        }
    }

    pub fn transactions_committed(&self) -> u64 {
        match self {
            Self::Committed(summary) => summary.transactions_committed(),
            _ => 0,
        }
    }
}

/// Primary Ledger Confirmation API
///
/// Node workers call the submission and request methods concurrently; a
/// single scheduler task calls `handle_ledger_extension_if_quorum`.
#[async_trait]
pub trait LedgerConfirmationApi: Send + Sync {
    /// Record a node's latest tip and cross-check it against the committed
    /// ledger if it is historical.
    fn submit_node_network_status(
        &self,
        node_name: &str,
        tip_state_version: StateVersion,
        tip_accumulator: Option<Hash>,
        target_state_version: StateVersion,
    );

    /// Buffer transactions reported by a node.
    ///
    /// Fails with `NodeState` if the node has not submitted its tip yet.
    /// Returns the number of transactions buffered.
    fn submit_transactions_from_node(
        &self,
        node_name: &str,
        transactions: Vec<CommittedTransaction>,
        response_size: u64,
    ) -> ConfirmationResult<usize>;

    /// The range the node should fetch next, or `None` to pause.
    fn get_which_transactions_are_requested_from_node(
        &self,
        node_name: &str,
    ) -> Option<TransactionsRequested>;

    /// Whether the node's buffered bytes above the committed tip are under
    /// the per-node ceiling.
    fn should_fetch_new_transactions(&self, node_name: &str) -> bool;

    /// Next state version the node should fetch, once a committed tip is known.
    fn first_state_version_to_fetch(&self, node_name: &str) -> Option<StateVersion>;

    /// Last committed tip seen by the confirmation loop.
    fn committed_tip(&self) -> Option<TransactionSummary>;

    /// Run one confirmation tick.
    async fn handle_ledger_extension_if_quorum(
        &self,
        cancel: &CancellationToken,
    ) -> ConfirmationResult<TickOutcome>;
}
