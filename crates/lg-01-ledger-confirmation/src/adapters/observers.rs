//! Confirmation Observer Adapters
//!
//! Implement `ConfirmationObserver` for the sinks the gateway ships with:
//! - `TracingObserver` - structured log lines
//! - `MetricsObserver` - Prometheus gauges (no-ops without the `metrics` feature)
//! - `BroadcastObserver` - fan-out to async consumers over a tokio channel
//! - `RecordingObserver` - in-memory capture, used by tests

use gateway_telemetry::{log_event, log_ledger_event, log_node_event};
use parking_lot::Mutex;
use shared_types::short_hex;
use tokio::sync::broadcast;

use crate::domain::{NodeTipStatus, QuorumVerdict};
use crate::events::{ConfirmationEvent, MetricStatus};
use crate::metrics;
use crate::ports::outbound::ConfirmationObserver;

const COMPONENT: &str = "ledger_confirmation";

// =============================================================================
// TracingObserver
// =============================================================================

/// Logs every event at a severity matching its importance.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ConfirmationObserver for TracingObserver {
    fn notify(&self, event: &ConfirmationEvent) {
        match event {
            ConfirmationEvent::QuorumReset => {
                log_event!(debug, COMPONENT, "Quorum status reset to unknown");
            }
            ConfirmationEvent::TickStarted { at } => {
                tracing::trace!(component = COMPONENT, at = %at, "Confirmation tick started");
            }
            ConfirmationEvent::TopOfLedgerRecorded {
                state_version,
                round_timestamp,
                read_duration,
            } => {
                log_ledger_event!(
                    debug,
                    COMPONENT,
                    "Top of committed ledger recorded",
                    *state_version,
                    round_timestamp = %round_timestamp,
                    read_ms = read_duration.map(|d| d.as_millis() as u64)
                );
            }
            ConfirmationEvent::NodeStatusSubmitted {
                node,
                tip_state_version,
                target_state_version,
            } => {
                log_node_event!(
                    trace,
                    COMPONENT,
                    "Node status submitted",
                    node,
                    tip_state_version = *tip_state_version,
                    target_state_version = *target_state_version
                );
            }
            ConfirmationEvent::NodeTipChecked {
                node,
                tip_state_version,
                status,
            } => match status {
                NodeTipStatus::OutOfDate => log_node_event!(
                    warn,
                    COMPONENT,
                    "Node ledger tip disagrees with the committed ledger - node is forked or corrupt",
                    node,
                    tip_state_version = *tip_state_version
                ),
                NodeTipStatus::UpToDate => log_node_event!(
                    debug,
                    COMPONENT,
                    "Node ledger tip is consistent with the committed ledger",
                    node,
                    tip_state_version = *tip_state_version
                ),
                NodeTipStatus::Unknown => log_node_event!(
                    debug,
                    COMPONENT,
                    "Node ledger tip is too far behind to check",
                    node,
                    tip_state_version = *tip_state_version
                ),
            },
            ConfirmationEvent::TrustWeightingComputed {
                requirement,
                configured_nodes,
                sufficiently_synced_nodes,
            } => {
                log_event!(
                    debug,
                    COMPONENT,
                    "Trust weighting computed",
                    configured_nodes = *configured_nodes,
                    sufficiently_synced_nodes = *sufficiently_synced_nodes,
                    total_trust = %requirement.total_trust_all_nodes,
                    synced_trust = %requirement.total_trust_sufficiently_synced,
                    required_trust_now = %requirement.required_trust_now,
                    required_trust_if_all_synced = %requirement.required_trust_if_all_nodes_synced
                );
            }
            ConfirmationEvent::NoVotersConfigured => {
                log_event!(
                    warn,
                    COMPONENT,
                    "Total trust weighting across all nodes is zero - perhaps no nodes are configured for transaction reading?"
                );
            }
            ConfirmationEvent::AwaitingSyncedNodes => {
                log_event!(
                    warn,
                    COMPONENT,
                    "Trust weighting required for extension is zero - nodes are yet to report or none is sufficiently synced"
                );
            }
            ConfirmationEvent::NodeReportInconsistent {
                node,
                state_version,
            } => {
                log_node_event!(
                    warn,
                    COMPONENT,
                    "Node reported a transaction that lost the quorum",
                    node,
                    state_version = *state_version
                );
            }
            ConfirmationEvent::NodeReportConsistent {
                node,
                state_version,
            } => {
                log_node_event!(
                    trace,
                    COMPONENT,
                    "Node agrees with quorum",
                    node,
                    state_version = *state_version
                );
            }
            ConfirmationEvent::QuorumNotReached {
                state_version,
                best_trust,
                required_trust_now,
                verdict,
            } => match verdict {
                QuorumVerdict::Lost => log_ledger_event!(
                    error,
                    COMPONENT,
                    "Quorum lost - even with every node synced no transaction can reach quorum",
                    *state_version,
                    best_trust = %best_trust,
                    required_trust_now = %required_trust_now
                ),
                QuorumVerdict::Unknown => log_ledger_event!(
                    warn,
                    COMPONENT,
                    "Quorum unknown - sufficiently synced nodes cannot reach quorum yet",
                    *state_version,
                    best_trust = %best_trust,
                    required_trust_now = %required_trust_now
                ),
                QuorumVerdict::Pending => log_ledger_event!(
                    debug,
                    COMPONENT,
                    "Waiting for more nodes to report",
                    *state_version,
                    best_trust = %best_trust,
                    required_trust_now = %required_trust_now
                ),
            },
            ConfirmationEvent::QuorumGained {
                transactions,
                final_state_version,
            } => {
                log_ledger_event!(
                    debug,
                    COMPONENT,
                    "Quorum reached for ledger extension",
                    *final_state_version,
                    transactions = *transactions
                );
            }
            ConfirmationEvent::ExtensionConsistencyGained { transactions } => {
                log_event!(
                    debug,
                    COMPONENT,
                    "Ledger extension is consistent",
                    transactions = *transactions
                );
            }
            ConfirmationEvent::ExtensionConsistencyLost { reason } => {
                log_event!(
                    error,
                    COMPONENT,
                    "Ledger extension failed consistency checks",
                    reason = %reason
                );
            }
            ConfirmationEvent::LedgerExtensionCommitted(summary) => {
                let report = &summary.report;
                let tip = &report.final_transaction;
                log_event!(
                    info,
                    COMPONENT,
                    "Committed transactions",
                    transactions = report.transactions_committed,
                    total_commit_ms = summary.total_commit_duration.as_millis() as u64,
                    entries_written = report.entries_written
                );
                log_event!(
                    info,
                    COMPONENT,
                    "Commit time splits",
                    raw_txn_ms = report.raw_txn_persistence.as_millis() as u64,
                    content_handling_ms = report.content_handling.as_millis() as u64,
                    dependencies_loading_ms = report.dependencies_loading.as_millis() as u64,
                    db_persistence_ms = report.db_persistence.as_millis() as u64
                );
                log_ledger_event!(
                    info,
                    COMPONENT,
                    "New committed ledger tip",
                    tip.state_version,
                    epoch = tip.epoch,
                    index_in_epoch = tip.index_in_epoch,
                    round_timestamp = %tip.round_timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
                    accumulator = %short_hex(&tip.accumulator),
                    round_lag_ms = summary.round_lag.num_milliseconds()
                );
            }
            ConfirmationEvent::BatchDelayEnforced {
                delay,
                transactions,
            } => {
                log_event!(
                    info,
                    COMPONENT,
                    "Enforcing delay due to the size of the ingestion batch",
                    delay_ms = delay.as_millis() as u64,
                    transactions = *transactions
                );
            }
        }
    }
}

// =============================================================================
// MetricsObserver
// =============================================================================

/// Maps events onto the Prometheus gauges in [`crate::metrics`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl MetricsObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ConfirmationObserver for MetricsObserver {
    fn notify(&self, event: &ConfirmationEvent) {
        match event {
            ConfirmationEvent::QuorumReset => {
                metrics::set_quorum_exists_status(MetricStatus::Unknown);
                metrics::set_extension_consistent_status(MetricStatus::Unknown);
            }
            ConfirmationEvent::TopOfLedgerRecorded {
                state_version,
                round_timestamp,
                ..
            } => metrics::record_top_of_ledger(*state_version, round_timestamp.timestamp()),
            ConfirmationEvent::NodeStatusSubmitted {
                node,
                tip_state_version,
                target_state_version,
            } => metrics::record_node_status(node, *tip_state_version, *target_state_version),
            ConfirmationEvent::NodeTipChecked { node, status, .. } => {
                metrics::set_node_consistency_status(node, MetricStatus::from(*status))
            }
            ConfirmationEvent::TrustWeightingComputed {
                requirement,
                configured_nodes,
                sufficiently_synced_nodes,
            } => metrics::record_trust_weighting(
                *configured_nodes,
                requirement.total_trust_all_nodes.as_f64(),
                *sufficiently_synced_nodes,
                requirement.total_trust_sufficiently_synced.as_f64(),
                requirement.required_trust_now.as_f64(),
                requirement.required_trust_if_all_nodes_synced.as_f64(),
            ),
            ConfirmationEvent::NodeReportInconsistent { node, .. } => {
                metrics::set_node_consistency_status(node, MetricStatus::No)
            }
            ConfirmationEvent::NodeReportConsistent { node, .. } => {
                metrics::set_node_consistency_status(node, MetricStatus::Yes)
            }
            ConfirmationEvent::QuorumNotReached { verdict, .. } => match verdict {
                QuorumVerdict::Lost => metrics::set_quorum_exists_status(MetricStatus::No),
                QuorumVerdict::Unknown => metrics::set_quorum_exists_status(MetricStatus::Unknown),
                QuorumVerdict::Pending => {}
            },
            ConfirmationEvent::QuorumGained { .. } => {
                metrics::set_quorum_exists_status(MetricStatus::Yes)
            }
            ConfirmationEvent::ExtensionConsistencyGained { .. } => {
                metrics::set_extension_consistent_status(MetricStatus::Yes)
            }
            ConfirmationEvent::ExtensionConsistencyLost { .. } => {
                metrics::set_extension_consistent_status(MetricStatus::No)
            }
            ConfirmationEvent::LedgerExtensionCommitted(summary) => metrics::record_commit(
                summary.transactions_committed(),
                summary.total_commit_duration.as_secs_f64(),
                summary.committed_at.timestamp(),
            ),
            ConfirmationEvent::TickStarted { .. }
            | ConfirmationEvent::NoVotersConfigured
            | ConfirmationEvent::AwaitingSyncedNodes
            | ConfirmationEvent::BatchDelayEnforced { .. } => {}
        }
    }
}

// =============================================================================
// BroadcastObserver
// =============================================================================

/// Re-publishes every event on a tokio broadcast channel.
///
/// Slow receivers lag and skip events; they never block the service.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<ConfirmationEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<ConfirmationEvent>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfirmationEvent> {
        self.sender.subscribe()
    }
}

impl ConfirmationObserver for BroadcastObserver {
    fn notify(&self, event: &ConfirmationEvent) {
        // No receivers is not an error: consumers may attach later
        let _ = self.sender.send(event.clone());
    }
}

// =============================================================================
// RecordingObserver
// =============================================================================

/// Captures every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ConfirmationEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConfirmationEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.name()).collect()
    }

    /// Drain the captured events.
    pub fn take(&self) -> Vec<ConfirmationEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ConfirmationObserver for RecordingObserver {
    fn notify(&self, event: &ConfirmationEvent) {
        self.events.lock().push(event.clone());
    }
}
