//! In-memory Ledger Extender
//!
//! Implements the `LedgerExtender` port over an in-process ledger. Used by
//! tests and local runs; production deployments plug in a database-backed
//! extender.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    pre_genesis_summary, CommittedTransaction, StateVersion, SyncTarget, TransactionSummary,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::domain::ConsistentLedgerExtension;
use crate::error::{ConfirmationError, ConfirmationResult};
use crate::ports::outbound::{CommitReport, LedgerExtender};

struct InMemoryLedger {
    top: TransactionSummary,
    transactions: BTreeMap<StateVersion, CommittedTransaction>,
    last_sync_target: Option<SyncTarget>,
    commits: usize,
}

/// Ledger extender keeping the committed ledger in memory.
pub struct InMemoryLedgerExtender {
    ledger: Mutex<InMemoryLedger>,
    failure: Mutex<Option<String>>,
    commit_delay: Mutex<Option<Duration>>,
}

impl Default for InMemoryLedgerExtender {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerExtender {
    /// Empty ledger, topped by the pre-genesis summary.
    pub fn new() -> Self {
        Self::with_top(pre_genesis_summary())
    }

    /// Ledger whose committed tip is `top`.
    pub fn with_top(top: TransactionSummary) -> Self {
        Self {
            ledger: Mutex::new(InMemoryLedger {
                top,
                transactions: BTreeMap::new(),
                last_sync_target: None,
                commits: 0,
            }),
            failure: Mutex::new(None),
            commit_delay: Mutex::new(None),
        }
    }

    /// Make the next commit fail with a persistence error.
    pub fn fail_next_commit(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    /// Make every commit take `delay` before it is applied.
    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        *self.commit_delay.lock() = delay;
    }

    pub fn top(&self) -> TransactionSummary {
        self.ledger.lock().top.clone()
    }

    pub fn committed_state_versions(&self) -> Vec<StateVersion> {
        self.ledger.lock().transactions.keys().copied().collect()
    }

    pub fn transaction_at(&self, state_version: StateVersion) -> Option<CommittedTransaction> {
        self.ledger.lock().transactions.get(&state_version).cloned()
    }

    pub fn last_sync_target(&self) -> Option<SyncTarget> {
        self.ledger.lock().last_sync_target
    }

    pub fn commit_count(&self) -> usize {
        self.ledger.lock().commits
    }
}

#[async_trait]
impl LedgerExtender for InMemoryLedgerExtender {
    async fn get_top_of_ledger(
        &self,
        _cancel: &CancellationToken,
    ) -> ConfirmationResult<TransactionSummary> {
        Ok(self.top())
    }

    async fn commit_transactions(
        &self,
        extension: ConsistentLedgerExtension,
        sync_target: SyncTarget,
        cancel: &CancellationToken,
    ) -> ConfirmationResult<CommitReport> {
        let started = Instant::now();

        let delay = *self.commit_delay.lock();
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ConfirmationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(reason) = self.failure.lock().take() {
            return Err(ConfirmationError::Persistence { reason });
        }

        let mut ledger = self.ledger.lock();
        if extension.parent_summary.state_version != ledger.top.state_version {
            return Err(ConfirmationError::Persistence {
                reason: format!(
                    "extension parent is at state version {} but the ledger tip is at {}",
                    extension.parent_summary.state_version, ledger.top.state_version
                ),
            });
        }

        let content_started = Instant::now();
        let final_transaction = extension.latest_summary().clone();
        let transactions_committed = extension.len() as u64;
        for validated in extension.transactions {
            ledger
                .transactions
                .insert(validated.summary.state_version, validated.transaction);
        }
        let content_handling = content_started.elapsed();

        ledger.top = final_transaction.clone();
        ledger.last_sync_target = Some(sync_target);
        ledger.commits += 1;

        Ok(CommitReport {
            transactions_committed,
            final_transaction,
            raw_txn_persistence: Duration::ZERO,
            content_handling,
            dependencies_loading: Duration::ZERO,
            db_persistence: started.elapsed(),
            entries_written: transactions_committed,
        })
    }
}
