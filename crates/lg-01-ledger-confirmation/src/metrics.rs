//! # Ledger Confirmation Metrics
//!
//! Prometheus metrics for monitoring quorum health and commit throughput.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! lg-01-ledger-confirmation = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! Status gauges are three-valued: 1 = yes, 0.5 = unknown, 0 = no.
//!
//! - `ng_ledger_sync_quorum_exists_status` - Whether enough nodes agree to keep committing (0 is a critical alarm)
//! - `ng_ledger_sync_quorum_extension_consistent_status` - Whether the quorum extension is internally consistent
//! - `ng_ledger_sync_sufficiently_synced_up_nodes_total` - Nodes that are sufficiently synced
//! - `ng_ledger_sync_sufficiently_synced_up_nodes_trust_weighting_total` - Trust of the sufficiently synced nodes
//! - `ng_ledger_sync_configured_nodes_total` - Nodes configured for transaction syncing
//! - `ng_ledger_sync_configured_nodes_trust_weighting_total` - Trust of the configured nodes
//! - `ng_ledger_sync_trust_weighting_required_for_quorum_total` - Trust currently required for quorum
//! - `ng_ledger_sync_trust_weighting_required_for_quorum_if_all_nodes_sufficiently_synced_total`
//! - `ng_ledger_commit_batch_commit_time_seconds` - Histogram of batch commit times
//! - `ng_ledger_commit_committed_transactions_count` - Counter of committed transactions
//! - `ng_ledger_commit_last_commit_timestamp_seconds` - Unix time of the last commit
//! - `ng_ledger_commit_tip_state_version` - State version of the committed tip
//! - `ng_ledger_commit_tip_round_unix_timestamp_seconds` - Round timestamp of the committed tip
//! - `ng_node_ledger_tip_state_version{node}` - Each node's reported tip
//! - `ng_node_ledger_target_state_version{node}` - Highest version each node has seen on the network
//! - `ng_node_ledger_tip_is_consistent_with_quorum_status{node}` - Whether each node agrees with the quorum

use crate::events::MetricStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    linear_buckets, register_counter, register_gauge, register_gauge_vec, register_histogram,
    Counter, Gauge, GaugeVec, Histogram,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref QUORUM_EXISTS_STATUS: Gauge = register_gauge!(
        "ng_ledger_sync_quorum_exists_status",
        "Whether enough nodes agree to continue committing transactions. 1 = true, 0.5 = unknown, 0 = false (critical alarm)."
    )
    .expect("Failed to create QUORUM_EXISTS_STATUS metric");

    pub static ref QUORUM_EXTENSION_CONSISTENT_STATUS: Gauge = register_gauge!(
        "ng_ledger_sync_quorum_extension_consistent_status",
        "Whether the quorum extension agrees with the committed ledger and is internally consistent. 1 = true, 0.5 = unknown, 0 = false."
    )
    .expect("Failed to create QUORUM_EXTENSION_CONSISTENT_STATUS metric");

    pub static ref SUFFICIENTLY_SYNCED_NODES: Gauge = register_gauge!(
        "ng_ledger_sync_sufficiently_synced_up_nodes_total",
        "The number of nodes which are sufficiently synced up."
    )
    .expect("Failed to create SUFFICIENTLY_SYNCED_NODES metric");

    pub static ref SUFFICIENTLY_SYNCED_NODES_TRUST: Gauge = register_gauge!(
        "ng_ledger_sync_sufficiently_synced_up_nodes_trust_weighting_total",
        "The trust weighting of all nodes which are currently sufficiently synced up."
    )
    .expect("Failed to create SUFFICIENTLY_SYNCED_NODES_TRUST metric");

    pub static ref CONFIGURED_NODES: Gauge = register_gauge!(
        "ng_ledger_sync_configured_nodes_total",
        "The number of nodes which are configured for transaction syncing."
    )
    .expect("Failed to create CONFIGURED_NODES metric");

    pub static ref CONFIGURED_NODES_TRUST: Gauge = register_gauge!(
        "ng_ledger_sync_configured_nodes_trust_weighting_total",
        "The trust weighting of all nodes which are configured for transaction syncing."
    )
    .expect("Failed to create CONFIGURED_NODES_TRUST metric");

    pub static ref TRUST_REQUIRED_FOR_QUORUM: Gauge = register_gauge!(
        "ng_ledger_sync_trust_weighting_required_for_quorum_total",
        "The trust weighting currently required for quorum."
    )
    .expect("Failed to create TRUST_REQUIRED_FOR_QUORUM metric");

    pub static ref TRUST_REQUIRED_IF_ALL_SYNCED: Gauge = register_gauge!(
        "ng_ledger_sync_trust_weighting_required_for_quorum_if_all_nodes_sufficiently_synced_total",
        "The trust weighting required for quorum, once all nodes are synced up."
    )
    .expect("Failed to create TRUST_REQUIRED_IF_ALL_SYNCED metric");

    pub static ref BATCH_COMMIT_TIME: Histogram = register_histogram!(
        "ng_ledger_commit_batch_commit_time_seconds",
        "Total time to commit a batch of transactions.",
        linear_buckets(0.2, 0.2, 100).expect("valid bucket layout")
    )
    .expect("Failed to create BATCH_COMMIT_TIME metric");

    pub static ref COMMITTED_TRANSACTIONS: Counter = register_counter!(
        "ng_ledger_commit_committed_transactions_count",
        "Count of committed transactions."
    )
    .expect("Failed to create COMMITTED_TRANSACTIONS metric");

    pub static ref LAST_COMMIT_TIMESTAMP: Gauge = register_gauge!(
        "ng_ledger_commit_last_commit_timestamp_seconds",
        "Unix timestamp of the last ledger commit."
    )
    .expect("Failed to create LAST_COMMIT_TIMESTAMP metric");

    pub static ref TIP_STATE_VERSION: Gauge = register_gauge!(
        "ng_ledger_commit_tip_state_version",
        "The state version of the top of the committed ledger."
    )
    .expect("Failed to create TIP_STATE_VERSION metric");

    pub static ref TIP_ROUND_TIMESTAMP: Gauge = register_gauge!(
        "ng_ledger_commit_tip_round_unix_timestamp_seconds",
        "Unix timestamp of the round at the top of the committed ledger."
    )
    .expect("Failed to create TIP_ROUND_TIMESTAMP metric");

    pub static ref NODE_TIP_STATE_VERSION: GaugeVec = register_gauge_vec!(
        "ng_node_ledger_tip_state_version",
        "The state version at the tip of the node's ledger.",
        &["node"]
    )
    .expect("Failed to create NODE_TIP_STATE_VERSION metric");

    pub static ref NODE_TARGET_STATE_VERSION: GaugeVec = register_gauge_vec!(
        "ng_node_ledger_target_state_version",
        "The state version which the node reports as the highest seen on the network.",
        &["node"]
    )
    .expect("Failed to create NODE_TARGET_STATE_VERSION metric");

    pub static ref NODE_CONSISTENCY_STATUS: GaugeVec = register_gauge_vec!(
        "ng_node_ledger_tip_is_consistent_with_quorum_status",
        "If the node's ledger is consistent with the committed quorum. 1 = true, 0.5 = unknown, 0 = false (node needs fixing).",
        &["node"]
    )
    .expect("Failed to create NODE_CONSISTENCY_STATUS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn set_quorum_exists_status(status: MetricStatus) {
    QUORUM_EXISTS_STATUS.set(status.as_gauge_value());
}

#[cfg(feature = "metrics")]
pub fn set_extension_consistent_status(status: MetricStatus) {
    QUORUM_EXTENSION_CONSISTENT_STATUS.set(status.as_gauge_value());
}

/// Record the per-tick trust weighting
#[cfg(feature = "metrics")]
pub fn record_trust_weighting(
    configured_nodes: usize,
    configured_trust: f64,
    synced_nodes: usize,
    synced_trust: f64,
    required_now: f64,
    required_if_all_synced: f64,
) {
    CONFIGURED_NODES.set(configured_nodes as f64);
    CONFIGURED_NODES_TRUST.set(configured_trust);
    SUFFICIENTLY_SYNCED_NODES.set(synced_nodes as f64);
    SUFFICIENTLY_SYNCED_NODES_TRUST.set(synced_trust);
    TRUST_REQUIRED_FOR_QUORUM.set(required_now);
    TRUST_REQUIRED_IF_ALL_SYNCED.set(required_if_all_synced);
}

/// Record a successful commit
#[cfg(feature = "metrics")]
pub fn record_commit(transactions: u64, commit_seconds: f64, committed_at_unix: i64) {
    BATCH_COMMIT_TIME.observe(commit_seconds);
    COMMITTED_TRANSACTIONS.inc_by(transactions as f64);
    LAST_COMMIT_TIMESTAMP.set(committed_at_unix as f64);
}

#[cfg(feature = "metrics")]
pub fn record_top_of_ledger(state_version: u64, round_timestamp_unix: i64) {
    TIP_STATE_VERSION.set(state_version as f64);
    TIP_ROUND_TIMESTAMP.set(round_timestamp_unix as f64);
}

#[cfg(feature = "metrics")]
pub fn record_node_status(node: &str, tip_state_version: u64, target_state_version: u64) {
    NODE_TIP_STATE_VERSION
        .with_label_values(&[node])
        .set(tip_state_version as f64);
    NODE_TARGET_STATE_VERSION
        .with_label_values(&[node])
        .set(target_state_version as f64);
}

#[cfg(feature = "metrics")]
pub fn set_node_consistency_status(node: &str, status: MetricStatus) {
    NODE_CONSISTENCY_STATUS
        .with_label_values(&[node])
        .set(status.as_gauge_value());
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn set_quorum_exists_status(_status: MetricStatus) {}

#[cfg(not(feature = "metrics"))]
pub fn set_extension_consistent_status(_status: MetricStatus) {}

#[cfg(not(feature = "metrics"))]
pub fn record_trust_weighting(
    _configured_nodes: usize,
    _configured_trust: f64,
    _synced_nodes: usize,
    _synced_trust: f64,
    _required_now: f64,
    _required_if_all_synced: f64,
) {
}

#[cfg(not(feature = "metrics"))]
pub fn record_commit(_transactions: u64, _commit_seconds: f64, _committed_at_unix: i64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_top_of_ledger(_state_version: u64, _round_timestamp_unix: i64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_node_status(_node: &str, _tip_state_version: u64, _target_state_version: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn set_node_consistency_status(_node: &str, _status: MetricStatus) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable_with_or_without_feature() {
        set_quorum_exists_status(MetricStatus::Unknown);
        set_extension_consistent_status(MetricStatus::Yes);
        record_trust_weighting(3, 3.0, 2, 2.0, 1.02, 1.53);
        record_commit(10, 0.4, 1_700_000_000);
        record_top_of_ledger(42, 1_700_000_000);
        record_node_status("node-1", 42, 50);
        set_node_consistency_status("node-1", MetricStatus::No);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_status_gauge_values() {
        set_node_consistency_status("node-status-test", MetricStatus::Unknown);
        assert_eq!(
            NODE_CONSISTENCY_STATUS
                .with_label_values(&["node-status-test"])
                .get(),
            0.5
        );
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_trust_gauges_are_exported() {
        record_trust_weighting(3, 3.0, 2, 2.0, 1.02, 1.53);
        let text = gateway_telemetry::encode_metrics().unwrap();
        assert!(text.contains("ng_ledger_sync_trust_weighting_required_for_quorum_total"));
        assert!(text.contains("ng_ledger_sync_configured_nodes_total"));
    }
}
