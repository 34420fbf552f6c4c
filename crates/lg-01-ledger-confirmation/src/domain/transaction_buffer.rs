//! # Node Transaction Buffer
//!
//! Per-node map of state version to reported transaction, plus the
//! byte-budgeted admission control that tells node workers whether (and
//! which range) to fetch next.
//!
//! ## Concurrency
//!
//! Each node's entries live behind their own `DashMap` shard entry, so node
//! workers never contend with each other on the same key. No cross-node
//! invariant is enforced at write time.

use dashmap::DashMap;
use shared_types::{CommittedTransaction, StateVersion};
use std::collections::BTreeMap;

/// A reported transaction with its estimated share of the response bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferedTransaction {
    pub transaction: CommittedTransaction,
    pub estimated_byte_size: u64,
}

/// Range of state versions a node worker should fetch next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionsRequested {
    pub state_version_exclusive_lower_bound: StateVersion,
    pub state_version_inclusive_upper_bound: StateVersion,
}

impl TransactionsRequested {
    /// First state version the node should return.
    pub fn first_requested(&self) -> StateVersion {
        self.state_version_exclusive_lower_bound + 1
    }
}

/// Concurrent per-node transaction buffers.
#[derive(Debug, Default)]
pub struct NodeTransactionBuffer {
    by_node: DashMap<String, BTreeMap<StateVersion, BufferedTransaction>>,
}

impl NodeTransactionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node's transactions, overwriting existing entries at the same
    /// state version.
    ///
    /// `response_size` is the byte size of the node response the batch came
    /// from; it is split evenly across the batch.
    pub fn insert_batch(
        &self,
        node_name: &str,
        transactions: Vec<CommittedTransaction>,
        response_size: u64,
    ) -> usize {
        if transactions.is_empty() {
            return 0;
        }
        let count = transactions.len();
        let estimated_byte_size = response_size / count as u64;

        let mut store = self.by_node.entry(node_name.to_string()).or_default();
        for transaction in transactions {
            store.insert(
                transaction.state_version,
                BufferedTransaction {
                    transaction,
                    estimated_byte_size,
                },
            );
        }
        count
    }

    pub fn get(&self, node_name: &str, state_version: StateVersion) -> Option<BufferedTransaction> {
        self.by_node
            .get(node_name)
            .and_then(|store| store.get(&state_version).cloned())
    }

    /// Every node's report at `state_version`, in node-name order.
    pub fn reports_at(&self, state_version: StateVersion) -> Vec<(String, CommittedTransaction)> {
        let mut reports: Vec<_> = self
            .by_node
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .get(&state_version)
                    .map(|b| (entry.key().clone(), b.transaction.clone()))
            })
            .collect();
        reports.sort_by(|a, b| a.0.cmp(&b.0));
        reports
    }

    pub fn len_for(&self, node_name: &str) -> usize {
        self.by_node.get(node_name).map(|s| s.len()).unwrap_or(0)
    }

    /// Range the node should fetch next, or `None` if it should pause.
    ///
    /// Walks forward from the committed tip to the node's first missing
    /// state version. Returns `None` if the node already holds everything up
    /// to `committed + max_pipeline_size`, or if the estimated bytes it holds
    /// before the gap exceed `max_pipeline_bytes`.
    pub fn requested_window(
        &self,
        node_name: &str,
        committed_state_version: StateVersion,
        max_pipeline_size: u64,
        max_pipeline_bytes: u64,
    ) -> Option<TransactionsRequested> {
        let inclusive_upper_bound = committed_state_version.saturating_add(max_pipeline_size);
        let store = self.by_node.get(node_name);
        let mut accumulated_bytes = 0u64;

        let mut first_gap = None;
        for state_version in (committed_state_version + 1)..=inclusive_upper_bound {
            match store.as_ref().and_then(|s| s.get(&state_version)) {
                Some(buffered) => {
                    accumulated_bytes += buffered.estimated_byte_size;
                    if accumulated_bytes > max_pipeline_bytes {
                        return None;
                    }
                }
                None => {
                    first_gap = Some(state_version);
                    break;
                }
            }
        }

        first_gap.map(|gap| TransactionsRequested {
            state_version_exclusive_lower_bound: gap - 1,
            state_version_inclusive_upper_bound: inclusive_upper_bound,
        })
    }

    /// Estimated bytes buffered for the node at or above `from_state_version`.
    pub fn estimated_bytes_from(&self, node_name: &str, from_state_version: StateVersion) -> u64 {
        self.by_node
            .get(node_name)
            .map(|store| {
                store
                    .range(from_state_version..)
                    .map(|(_, b)| b.estimated_byte_size)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Whether the node is under its byte ceiling for versions at or above
    /// `from_state_version`.
    pub fn should_fetch_more(
        &self,
        node_name: &str,
        from_state_version: StateVersion,
        max_pipeline_bytes: u64,
    ) -> bool {
        self.estimated_bytes_from(node_name, from_state_version) < max_pipeline_bytes
    }

    /// Next state version the node worker should fetch: one past the highest
    /// version it has buffered above the committed tip.
    pub fn first_state_version_to_fetch(
        &self,
        node_name: &str,
        committed_state_version: StateVersion,
    ) -> StateVersion {
        let last_known = self
            .by_node
            .get(node_name)
            .and_then(|store| {
                store
                    .range(committed_state_version..)
                    .next_back()
                    .map(|(v, _)| *v)
            })
            .unwrap_or(0);
        (last_known + 1).max(committed_state_version + 1)
    }

    /// Drop every entry at or below `committed_state_version`, for every node.
    pub fn prune_up_to(&self, committed_state_version: StateVersion) -> usize {
        let mut removed = 0;
        for mut store in self.by_node.iter_mut() {
            let kept = store.split_off(&(committed_state_version + 1));
            removed += store.len();
            *store = kept;
        }
        removed
    }
}
