//! Ledger Confirmation Service - Core orchestration
//!
//! Node workers call the submission methods concurrently; they only ever
//! touch the tip tracker and the transaction buffer. The confirmation tick
//! is the single writer of the committed tip, the accumulator cache and the
//! config snapshot, and never mutates any of them until a commit succeeds.
//!
//! ## Tick
//!
//! ```text
//! top of ledger ─→ config snapshot ─→ trust weighting ─→ quorum walk
//!                                                            │
//!     prune ←─ advance tip ←─ cache accumulators ←─ commit ←─ validate
//! ```

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use shared_types::{CommittedTransaction, Hash, StateVersion, TransactionSummary};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{GatewayConfig, LedgerConfirmationConfig, NodeRecord};
use crate::domain::{
    classify_tip, AccumulatorCache, ConsistencyValidator, NodeTipRecord, NodeTipTracker,
    NodeTransactionBuffer, QuorumExtension, QuorumExtensionBuilder, TransactionsRequested,
    TrustThreshold, TrustWeightingCalculator,
};
use crate::error::{ConfirmationError, ConfirmationResult};
use crate::events::{CommitSummary, ConfirmationEvent};
use crate::ports::inbound::{LedgerConfirmationApi, TickOutcome};
use crate::ports::outbound::{ConfigProvider, ConfirmationObserver, LedgerExtender};

/// Ledger Confirmation Service implementation
pub struct LedgerConfirmationService<E, C>
where
    E: LedgerExtender,
    C: ConfigProvider,
{
    extender: Arc<E>,
    config_provider: Arc<C>,
    observers: Vec<Arc<dyn ConfirmationObserver>>,
    validator: ConsistencyValidator,

    /// Written by node workers
    tips: NodeTipTracker,
    buffer: NodeTransactionBuffer,

    /// Written only by the confirmation tick
    accumulators: AccumulatorCache,
    committed_tip: RwLock<Option<TransactionSummary>>,
    config_snapshot: RwLock<LedgerConfirmationConfig>,

    /// Serializes confirmation ticks
    tick_lock: tokio::sync::Mutex<()>,
}

impl<E, C> LedgerConfirmationService<E, C>
where
    E: LedgerExtender,
    C: ConfigProvider,
{
    /// Create a new confirmation service.
    ///
    /// Observers receive every event in the order given here, starting with
    /// a `QuorumReset`.
    pub fn new(
        extender: Arc<E>,
        config_provider: Arc<C>,
        observers: Vec<Arc<dyn ConfirmationObserver>>,
    ) -> Self {
        let config = config_provider.current().ledger_confirmation;
        let service = Self {
            extender,
            config_provider,
            observers,
            validator: ConsistencyValidator::new(),
            tips: NodeTipTracker::new(),
            buffer: NodeTransactionBuffer::new(),
            accumulators: AccumulatorCache::new(config.accumulator_cache_capacity),
            committed_tip: RwLock::new(None),
            config_snapshot: RwLock::new(config),
            tick_lock: tokio::sync::Mutex::new(()),
        };
        service.emit(ConfirmationEvent::QuorumReset);
        service
    }

    pub fn node_tips(&self) -> &NodeTipTracker {
        &self.tips
    }

    pub fn transaction_buffer(&self) -> &NodeTransactionBuffer {
        &self.buffer
    }

    pub fn accumulator_cache(&self) -> &AccumulatorCache {
        &self.accumulators
    }

    /// Engine parameters as of the last tick.
    pub fn config_snapshot(&self) -> LedgerConfirmationConfig {
        self.config_snapshot.read().clone()
    }

    fn emit(&self, event: ConfirmationEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }

    fn committed_state_version(&self) -> Option<StateVersion> {
        self.committed_tip.read().as_ref().map(|t| t.state_version)
    }

    fn record_top_of_ledger(&self, top: TransactionSummary, read_duration: Option<Duration>) {
        self.emit(ConfirmationEvent::TopOfLedgerRecorded {
            state_version: top.state_version,
            round_timestamp: top.round_timestamp,
            read_duration,
        });
        *self.committed_tip.write() = Some(top);
    }

    fn refresh_config(&self) -> ConfirmationResult<GatewayConfig> {
        let config = self.config_provider.current();
        config.validate()?;
        self.accumulators
            .resize(config.ledger_confirmation.accumulator_cache_capacity);
        *self.config_snapshot.write() = config.ledger_confirmation.clone();
        Ok(config)
    }

    /// Per-node consistency for every accepted position (losers first), then
    /// the verdict at the stalled position, then quorum gained.
    fn report_quorum(&self, extension: &QuorumExtension, required_trust_now: TrustThreshold) {
        for position in &extension.accepted {
            let state_version = position.claim.transaction.state_version;
            for node in &position.inconsistent_node_names {
                self.emit(ConfirmationEvent::NodeReportInconsistent {
                    node: node.clone(),
                    state_version,
                });
            }
            for node in &position.claim.supporting_node_names {
                self.emit(ConfirmationEvent::NodeReportConsistent {
                    node: node.clone(),
                    state_version,
                });
            }
        }

        if let Some(stalled) = &extension.stalled {
            self.emit(ConfirmationEvent::QuorumNotReached {
                state_version: stalled.state_version,
                best_trust: stalled.best_trust,
                required_trust_now,
                verdict: stalled.verdict,
            });
        }

        if let Some(last) = extension.accepted.last() {
            self.emit(ConfirmationEvent::QuorumGained {
                transactions: extension.len(),
                final_state_version: last.claim.transaction.state_version,
            });
        }
    }

    async fn run_tick(&self, cancel: &CancellationToken) -> ConfirmationResult<TickOutcome> {
        self.emit(ConfirmationEvent::TickStarted { at: Utc::now() });

        let read_started = Instant::now();
        let top = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConfirmationError::Cancelled),
            top = self.extender.get_top_of_ledger(cancel) => top?,
        };
        self.record_top_of_ledger(top.clone(), Some(read_started.elapsed()));

        let config = self.refresh_config()?;
        let lc = &config.ledger_confirmation;
        let voters: Vec<NodeRecord> = config.voting_nodes().cloned().collect();

        let weighting = TrustWeightingCalculator::new(lc).compute(&voters, &self.tips, top.state_version);
        let requirement = weighting.requirement;
        self.emit(ConfirmationEvent::TrustWeightingComputed {
            requirement,
            configured_nodes: weighting.configured_nodes,
            sufficiently_synced_nodes: weighting.sufficiently_synced_nodes,
        });

        if requirement.has_no_voters() {
            self.emit(ConfirmationEvent::NoVotersConfigured);
            return Ok(TickOutcome::NoVotersConfigured);
        }
        if requirement.is_waiting_for_synced_nodes() {
            self.emit(ConfirmationEvent::AwaitingSyncedNodes);
            return Ok(TickOutcome::AwaitingSyncedNodes);
        }

        let extension = QuorumExtensionBuilder::new(&self.buffer, &weighting, lc.max_commit_batch_size)
            .build(top.state_version);
        self.report_quorum(&extension, requirement.required_trust_now);

        if extension.is_empty() {
            return Ok(match &extension.stalled {
                Some(stalled) => TickOutcome::NoQuorum {
                    state_version: stalled.state_version,
                },
                None => TickOutcome::NothingToCommit,
            });
        }

        let consistent = match self
            .validator
            .validate(&top, extension.into_transactions(), Utc::now())
        {
            Ok(consistent) => {
                self.emit(ConfirmationEvent::ExtensionConsistencyGained {
                    transactions: consistent.len(),
                });
                consistent
            }
            Err(e) => {
                self.emit(ConfirmationEvent::ExtensionConsistencyLost {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let sync_target = self.tips.sync_target()?;
        let accumulators: Vec<(StateVersion, Hash)> = consistent.accumulators().collect();
        let latest_round_timestamp = consistent.latest_summary().round_timestamp;

        let commit_started = Instant::now();
        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(
                    state_version = top.state_version,
                    "[lg-01] Commit abandoned on cancellation, nothing applied"
                );
                return Err(ConfirmationError::Cancelled);
            }
            report = self.extender.commit_transactions(consistent, sync_target, cancel) => report?,
        };
        let total_commit_duration = commit_started.elapsed();

        // The tip must advance before pruning, so node workers never see the
        // pruned range as a gap to refill
        let final_state_version = report.final_state_version();
        self.accumulators.extend(accumulators);
        self.record_top_of_ledger(report.final_transaction.clone(), None);
        self.buffer.prune_up_to(final_state_version);

        let committed_at = Utc::now();
        let summary = CommitSummary {
            report,
            total_commit_duration,
            round_lag: committed_at - latest_round_timestamp,
            committed_at,
        };
        self.emit(ConfirmationEvent::LedgerExtensionCommitted(summary.clone()));

        let committed = summary.transactions_committed();
        if lc.should_delay_after(committed) {
            let delay = lc.delay_between_large_batches();
            self.emit(ConfirmationEvent::BatchDelayEnforced {
                delay,
                transactions: committed,
            });
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Ok(TickOutcome::Committed(summary))
    }
}

#[async_trait]
impl<E, C> LedgerConfirmationApi for LedgerConfirmationService<E, C>
where
    E: LedgerExtender,
    C: ConfigProvider,
{
    fn submit_node_network_status(
        &self,
        node_name: &str,
        tip_state_version: StateVersion,
        tip_accumulator: Option<Hash>,
        target_state_version: StateVersion,
    ) {
        self.emit(ConfirmationEvent::NodeStatusSubmitted {
            node: node_name.to_string(),
            tip_state_version,
            target_state_version,
        });

        self.tips.record(NodeTipRecord {
            node_name: node_name.to_string(),
            ledger_tip_state_version: tip_state_version,
            ledger_tip_accumulator: tip_accumulator,
            target_state_version,
        });

        let status = classify_tip(
            tip_state_version,
            tip_accumulator.as_ref(),
            self.committed_state_version(),
            &self.accumulators,
        );
        if let Some(status) = status {
            self.emit(ConfirmationEvent::NodeTipChecked {
                node: node_name.to_string(),
                tip_state_version,
                status,
            });
        }
    }

    fn submit_transactions_from_node(
        &self,
        node_name: &str,
        transactions: Vec<CommittedTransaction>,
        response_size: u64,
    ) -> ConfirmationResult<usize> {
        if !self.tips.has_submitted(node_name) {
            return Err(ConfirmationError::NodeState {
                node: node_name.to_string(),
            });
        }
        Ok(self
            .buffer
            .insert_batch(node_name, transactions, response_size))
    }

    fn get_which_transactions_are_requested_from_node(
        &self,
        node_name: &str,
    ) -> Option<TransactionsRequested> {
        let committed = self.committed_state_version()?;
        let config = self.config_snapshot.read();
        self.buffer.requested_window(
            node_name,
            committed,
            config.max_transaction_pipeline_size_per_node,
            config.max_estimated_transaction_pipeline_byte_size_per_node,
        )
    }

    fn should_fetch_new_transactions(&self, node_name: &str) -> bool {
        let Some(committed) = self.committed_state_version() else {
            return false;
        };
        let max_bytes = self
            .config_snapshot
            .read()
            .max_estimated_transaction_pipeline_byte_size_per_node;
        self.buffer
            .should_fetch_more(node_name, committed + 1, max_bytes)
    }

    fn first_state_version_to_fetch(&self, node_name: &str) -> Option<StateVersion> {
        self.committed_state_version()
            .map(|committed| self.buffer.first_state_version_to_fetch(node_name, committed))
    }

    fn committed_tip(&self) -> Option<TransactionSummary> {
        self.committed_tip.read().clone()
    }

    async fn handle_ledger_extension_if_quorum(
        &self,
        cancel: &CancellationToken,
    ) -> ConfirmationResult<TickOutcome> {
        let _tick = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConfirmationError::Cancelled),
            guard = self.tick_lock.lock() => guard,
        };
        self.run_tick(cancel).await
    }
}
