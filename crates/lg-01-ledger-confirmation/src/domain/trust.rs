//! # Trust Weighting
//!
//! Derives the per-tick quorum requirement from the node registry and the
//! nodes' reported tips. All sums and thresholds use the exact fixed-point
//! types from [`super::weight`].

use shared_types::StateVersion;
use std::collections::HashMap;

use super::node_tips::NodeTipTracker;
use super::weight::{TrustThreshold, TrustWeight};
use crate::config::{LedgerConfirmationConfig, NodeRecord};

/// Trust available and required for quorum during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuorumRequirement {
    pub total_trust_all_nodes: TrustWeight,
    pub total_trust_sufficiently_synced: TrustWeight,
    pub required_trust_now: TrustThreshold,
    pub required_trust_if_all_nodes_synced: TrustThreshold,
}

impl QuorumRequirement {
    /// No enabled node carries any trust.
    pub fn has_no_voters(&self) -> bool {
        self.total_trust_all_nodes.is_zero()
    }

    /// Nothing can be committed yet, e.g. no node is sufficiently synced.
    pub fn is_waiting_for_synced_nodes(&self) -> bool {
        self.required_trust_now.is_zero()
    }

    pub fn is_met_by(&self, trust: TrustWeight) -> bool {
        self.required_trust_now.is_met_by(trust)
    }
}

/// Requirement plus the node counts behind it, for reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct TrustWeightingReport {
    pub requirement: QuorumRequirement,
    pub configured_nodes: usize,
    pub sufficiently_synced_nodes: usize,
    /// Trust weighting of each voting node
    pub trust_by_node: HashMap<String, TrustWeight>,
}

impl TrustWeightingReport {
    pub fn trust_of(&self, node_name: &str) -> TrustWeight {
        self.trust_by_node.get(node_name).copied().unwrap_or_default()
    }
}

/// Computes the quorum requirement for a tick.
pub struct TrustWeightingCalculator<'a> {
    config: &'a LedgerConfirmationConfig,
}

impl<'a> TrustWeightingCalculator<'a> {
    pub fn new(config: &'a LedgerConfirmationConfig) -> Self {
        Self { config }
    }

    /// `voters` must already be filtered to enabled, indexing-eligible nodes.
    pub fn compute(
        &self,
        voters: &[NodeRecord],
        tips: &NodeTipTracker,
        committed_state_version: StateVersion,
    ) -> TrustWeightingReport {
        let threshold = self.config.sufficiently_synced_state_version_threshold;

        let mut total_trust_all_nodes = TrustWeight::ZERO;
        let mut total_trust_sufficiently_synced = TrustWeight::ZERO;
        let mut sufficiently_synced_nodes = 0;
        let mut trust_by_node = HashMap::with_capacity(voters.len());

        for node in voters {
            total_trust_all_nodes += node.trust_weighting;
            trust_by_node.insert(node.name.clone(), node.trust_weighting);

            if tips.is_sufficiently_synced(&node.name, committed_state_version, threshold) {
                total_trust_sufficiently_synced += node.trust_weighting;
                sufficiently_synced_nodes += 1;
            }
        }

        let proportion = self.config.commit_requires_node_quorum_trust_proportion;
        let baseline = if self.config.only_use_sufficiently_synced_nodes_for_quorum {
            total_trust_sufficiently_synced
        } else {
            total_trust_all_nodes
        };

        TrustWeightingReport {
            requirement: QuorumRequirement {
                total_trust_all_nodes,
                total_trust_sufficiently_synced,
                required_trust_now: proportion.of(baseline),
                required_trust_if_all_nodes_synced: proportion.of(total_trust_all_nodes),
            },
            configured_nodes: voters.len(),
            sufficiently_synced_nodes,
            trust_by_node,
        }
    }
}
