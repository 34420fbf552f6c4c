//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use shared_types::{StateVersion, SyncTarget, TransactionSummary};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::domain::ConsistentLedgerExtension;
use crate::error::ConfirmationResult;
use crate::events::ConfirmationEvent;

/// Outcome of a successful commit, as reported by persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReport {
    pub transactions_committed: u64,
    /// Summary of the new top of the ledger
    pub final_transaction: TransactionSummary,
    pub raw_txn_persistence: Duration,
    pub content_handling: Duration,
    pub dependencies_loading: Duration,
    pub db_persistence: Duration,
    pub entries_written: u64,
}

impl CommitReport {
    pub fn final_state_version(&self) -> StateVersion {
        self.final_transaction.state_version
    }
}

/// The only component allowed to durably persist an extension.
///
/// `commit_transactions` is all-or-nothing: on error, nothing was persisted.
#[async_trait]
pub trait LedgerExtender: Send + Sync {
    /// Authoritative committed tip.
    async fn get_top_of_ledger(
        &self,
        cancel: &CancellationToken,
    ) -> ConfirmationResult<TransactionSummary>;

    /// Persist a validated extension.
    async fn commit_transactions(
        &self,
        extension: ConsistentLedgerExtension,
        sync_target: SyncTarget,
        cancel: &CancellationToken,
    ) -> ConfirmationResult<CommitReport>;
}

/// Receives every confirmation event, synchronously and in order.
///
/// Implementations must not block: they run inline on the caller's task.
pub trait ConfirmationObserver: Send + Sync {
    fn notify(&self, event: &ConfirmationEvent);
}

/// Source of the (hot-reloadable) gateway configuration.
///
/// Read once at the start of every confirmation tick.
pub trait ConfigProvider: Send + Sync {
    fn current(&self) -> GatewayConfig;
}
