//! # Node Tip Tracker
//!
//! Latest self-reported ledger tip of every node.
//!
//! Written concurrently by the node workers (last write wins), read by the
//! confirmation loop to decide which nodes are sufficiently synced and what
//! the network-wide sync target is.

use dashmap::DashMap;
use shared_types::{Hash, StateVersion, SyncTarget};

use super::accumulator_cache::AccumulatorCache;
use crate::error::{ConfirmationError, ConfirmationResult};

/// A node's most recent status submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeTipRecord {
    pub node_name: String,
    pub ledger_tip_state_version: StateVersion,
    pub ledger_tip_accumulator: Option<Hash>,
    /// Highest state version the node has seen on the network
    pub target_state_version: StateVersion,
}

/// Outcome of cross-checking a historical tip against committed accumulators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeTipStatus {
    /// Accumulator matches the committed ledger
    UpToDate,
    /// Accumulator differs: the node is forked or corrupt
    OutOfDate,
    /// Tip is too far behind to still be cached
    Unknown,
}

/// Concurrent per-node tip records.
#[derive(Debug, Default)]
pub struct NodeTipTracker {
    tips: DashMap<String, NodeTipRecord>,
}

impl NodeTipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the node's latest tip, replacing any previous record.
    pub fn record(&self, record: NodeTipRecord) {
        self.tips.insert(record.node_name.clone(), record);
    }

    pub fn get(&self, node_name: &str) -> Option<NodeTipRecord> {
        self.tips.get(node_name).map(|r| r.value().clone())
    }

    pub fn tip_of(&self, node_name: &str) -> Option<StateVersion> {
        self.tips
            .get(node_name)
            .map(|r| r.value().ledger_tip_state_version)
    }

    pub fn has_submitted(&self, node_name: &str) -> bool {
        self.tips.contains_key(node_name)
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    /// Highest tip reported by any node.
    pub fn sync_target(&self) -> ConfirmationResult<SyncTarget> {
        self.tips
            .iter()
            .map(|r| r.value().ledger_tip_state_version)
            .max()
            .map(|target_state_version| SyncTarget {
                target_state_version,
            })
            .ok_or(ConfirmationError::NoTipsSubmitted)
    }

    /// Whether the node's tip is close enough to the committed tip for its
    /// vote to count towards the present-time quorum.
    ///
    /// A node that has never reported (or reported tip 0) is never synced.
    pub fn is_sufficiently_synced(
        &self,
        node_name: &str,
        committed_state_version: StateVersion,
        threshold: u64,
    ) -> bool {
        match self.tip_of(node_name) {
            Some(tip) if tip != 0 => tip.saturating_add(threshold) > committed_state_version,
            _ => false,
        }
    }
}

/// Cross-check a reported tip against the committed ledger.
///
/// Returns `None` when the tip is ahead of the committed tip: such positions
/// are only validated if and when they are chosen for an extension.
pub fn classify_tip(
    tip_state_version: StateVersion,
    tip_accumulator: Option<&Hash>,
    committed_state_version: Option<StateVersion>,
    cache: &AccumulatorCache,
) -> Option<NodeTipStatus> {
    if matches!(committed_state_version, Some(committed) if tip_state_version > committed) {
        return None;
    }

    let status = match (cache.get(tip_state_version), tip_accumulator) {
        (Some(cached), Some(reported)) if cached == *reported => NodeTipStatus::UpToDate,
        (Some(_), Some(_)) => NodeTipStatus::OutOfDate,
        _ => NodeTipStatus::Unknown,
    };
    Some(status)
}
