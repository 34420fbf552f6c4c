//! # Quorum Extension Builder
//!
//! Walks state versions forward from the committed tip and, at each
//! position, picks the transaction content backed by the most trust.
//!
//! ## Algorithm
//!
//! ```text
//! for v in committed+1 .. committed+max_batch:
//!     reports  = every node's buffered transaction at v
//!     claims   = reports grouped by content identity, trust summed per group
//!     chosen   = claim with the highest trust
//!     if chosen.trust >= required_now: accept, continue
//!     else: classify why (pending / unknown / lost) and stop
//! ```
//!
//! Reports are grouped by `(accumulator, payload_hash)`, so two nodes
//! disagreeing on the content at the same height land in separate claims and
//! the minority is flagged as inconsistent. An extension never skips an
//! unresolved position.

use shared_types::{CommittedTransaction, StateVersion, TransactionIdentity};

use super::transaction_buffer::NodeTransactionBuffer;
use super::trust::TrustWeightingReport;
use super::weight::TrustWeight;

/// Nodes agreeing on one transaction content at one state version.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionClaim {
    pub transaction: CommittedTransaction,
    pub supporting_node_names: Vec<String>,
    pub aggregated_trust: TrustWeight,
}

/// Ranking of the claims reported at one state version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MostTrustedTransaction {
    /// Claim with the most trust, if any node reported this position
    pub best: Option<TransactionClaim>,
    /// Trust of every node that reported this position, whatever the content
    pub total_trust_committed_by_nodes: TrustWeight,
    /// Nodes backing a losing claim
    pub inconsistent_node_names: Vec<String>,
}

impl MostTrustedTransaction {
    pub fn best_trust(&self) -> TrustWeight {
        self.best
            .as_ref()
            .map(|c| c.aggregated_trust)
            .unwrap_or_default()
    }
}

/// A position that reached quorum.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptedPosition {
    pub claim: TransactionClaim,
    pub inconsistent_node_names: Vec<String>,
}

/// Why the walk stopped at a position short of quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuorumVerdict {
    /// Enough synced trust has not voted yet; waiting is expected
    Pending,
    /// Even every sufficiently synced node could not reach quorum now
    Unknown,
    /// Even with every node synced, quorum is unreachable
    Lost,
}

/// The position the walk stopped at.
#[derive(Clone, Debug, PartialEq)]
pub struct StalledPosition {
    pub state_version: StateVersion,
    pub best_trust: TrustWeight,
    pub total_trust_committed_by_nodes: TrustWeight,
    pub verdict: QuorumVerdict,
}

/// Result of one walk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuorumExtension {
    pub accepted: Vec<AcceptedPosition>,
    pub stalled: Option<StalledPosition>,
}

impl QuorumExtension {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn into_transactions(self) -> Vec<CommittedTransaction> {
        self.accepted
            .into_iter()
            .map(|p| p.claim.transaction)
            .collect()
    }
}

/// Builds the quorum-backed extension for one tick.
pub struct QuorumExtensionBuilder<'a> {
    buffer: &'a NodeTransactionBuffer,
    weighting: &'a TrustWeightingReport,
    max_commit_batch_size: u64,
}

impl<'a> QuorumExtensionBuilder<'a> {
    pub fn new(
        buffer: &'a NodeTransactionBuffer,
        weighting: &'a TrustWeightingReport,
        max_commit_batch_size: u64,
    ) -> Self {
        Self {
            buffer,
            weighting,
            max_commit_batch_size,
        }
    }

    /// Group the reports at `state_version` by content and rank them.
    ///
    /// Nodes outside the voting set still appear in claims, with zero trust.
    pub fn find_most_trusted(&self, state_version: StateVersion) -> MostTrustedTransaction {
        let reports = self.buffer.reports_at(state_version);
        if reports.is_empty() {
            return MostTrustedTransaction::default();
        }

        // Claims in order of first appearance, so equal-trust ties resolve
        // deterministically
        let mut claims: Vec<(TransactionIdentity, TransactionClaim)> = Vec::new();
        for (node_name, transaction) in reports {
            let trust = self.weighting.trust_of(&node_name);
            let identity = transaction.identity();
            match claims.iter_mut().find(|(id, _)| *id == identity) {
                Some((_, claim)) => {
                    claim.supporting_node_names.push(node_name);
                    claim.aggregated_trust += trust;
                }
                None => claims.push((
                    identity,
                    TransactionClaim {
                        transaction,
                        supporting_node_names: vec![node_name],
                        aggregated_trust: trust,
                    },
                )),
            }
        }

        let total_trust_committed_by_nodes = claims.iter().map(|(_, c)| c.aggregated_trust).sum();

        let mut ranked: Vec<TransactionClaim> = claims.into_iter().map(|(_, c)| c).collect();
        ranked.sort_by(|a, b| b.aggregated_trust.cmp(&a.aggregated_trust));

        let mut ranked = ranked.into_iter();
        let best = ranked.next();
        let inconsistent_node_names = ranked.flat_map(|c| c.supporting_node_names).collect();

        MostTrustedTransaction {
            best,
            total_trust_committed_by_nodes,
            inconsistent_node_names,
        }
    }

    /// Walk forward from `committed_state_version`, accepting positions until
    /// one falls short of quorum or the batch is full.
    pub fn build(&self, committed_state_version: StateVersion) -> QuorumExtension {
        let requirement = &self.weighting.requirement;
        let mut extension = QuorumExtension::default();

        let start = committed_state_version + 1;
        let end = start.saturating_add(self.max_commit_batch_size);

        for state_version in start..end {
            let ranked = self.find_most_trusted(state_version);

            let have_quorum = ranked
                .best
                .as_ref()
                .is_some_and(|claim| requirement.is_met_by(claim.aggregated_trust));

            if have_quorum {
                let MostTrustedTransaction {
                    best,
                    inconsistent_node_names,
                    ..
                } = ranked;
                if let Some(claim) = best {
                    extension.accepted.push(AcceptedPosition {
                        claim,
                        inconsistent_node_names,
                    });
                }
                continue;
            }

            let best_trust = ranked.best_trust();
            let committed_trust = ranked.total_trust_committed_by_nodes;

            let remaining_from_synced = requirement
                .total_trust_sufficiently_synced
                .saturating_sub(committed_trust);
            let remaining_from_all = requirement
                .total_trust_all_nodes
                .saturating_sub(committed_trust);

            let verdict = if !requirement
                .required_trust_if_all_nodes_synced
                .is_met_by(best_trust + remaining_from_all)
            {
                QuorumVerdict::Lost
            } else if !requirement
                .required_trust_now
                .is_met_by(best_trust + remaining_from_synced)
            {
                QuorumVerdict::Unknown
            } else {
                QuorumVerdict::Pending
            };

            extension.stalled = Some(StalledPosition {
                state_version,
                best_trust,
                total_trust_committed_by_nodes: committed_trust,
                verdict,
            });
            break;
        }

        extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LedgerConfirmationConfig, NodeRecord};
    use crate::domain::node_tips::{NodeTipRecord, NodeTipTracker};
    use crate::domain::trust::TrustWeightingCalculator;
    use crate::domain::weight::QuorumProportion;
    use shared_types::TransactionOrigin;

    fn tx(state_version: StateVersion, marker: u8) -> CommittedTransaction {
        CommittedTransaction {
            state_version,
            accumulator: [marker; 32],
            payload_hash: [marker; 32],
            intent_hash: None,
            origin: TransactionOrigin::System,
            payload: None,
            new_epoch: None,
            new_round: None,
        }
    }

    /// Weighting over `nodes` given as `(name, trust, tip)`.
    fn weighting_at(
        config: &LedgerConfirmationConfig,
        nodes: &[(&str, u64, StateVersion)],
        committed_state_version: StateVersion,
    ) -> TrustWeightingReport {
        let tips = NodeTipTracker::new();
        for (name, _, tip) in nodes {
            tips.record(NodeTipRecord {
                node_name: name.to_string(),
                ledger_tip_state_version: *tip,
                ledger_tip_accumulator: None,
                target_state_version: *tip,
            });
        }
        let voters: Vec<_> = nodes
            .iter()
            .map(|(n, w, _)| NodeRecord::new(*n, TrustWeight::whole(*w)))
            .collect();
        TrustWeightingCalculator::new(config).compute(&voters, &tips, committed_state_version)
    }

    fn weighting(nodes: &[(&str, u64)], tip: StateVersion) -> TrustWeightingReport {
        let nodes: Vec<_> = nodes.iter().map(|(n, w)| (*n, *w, tip)).collect();
        weighting_at(&LedgerConfirmationConfig::default(), &nodes, 0)
    }

    #[test]
    fn test_two_of_three_reach_quorum() {
        let buffer = NodeTransactionBuffer::new();
        buffer.insert_batch("a", vec![tx(1, 1)], 10);
        buffer.insert_batch("b", vec![tx(1, 1)], 10);
        let weighting = weighting(&[("a", 1), ("b", 1), ("c", 1)], 10);

        let extension = QuorumExtensionBuilder::new(&buffer, &weighting, 100).build(0);
        assert_eq!(extension.len(), 1);
        assert_eq!(
            extension.accepted[0].claim.supporting_node_names,
            vec!["a".to_string(), "b".to_string()]
        );
        // Walk stops at the next, unreported position
        assert_eq!(extension.stalled.as_ref().unwrap().state_version, 2);
    }

    #[test]
    fn test_single_node_does_not_reach_quorum() {
        let buffer = NodeTransactionBuffer::new();
        buffer.insert_batch("a", vec![tx(1, 1)], 10);
        let weighting = weighting(&[("a", 1), ("b", 1), ("c", 1)], 10);

        let extension = QuorumExtensionBuilder::new(&buffer, &weighting, 100).build(0);
        assert!(extension.is_empty());
        let stalled = extension.stalled.unwrap();
        assert_eq!(stalled.best_trust, TrustWeight::whole(1));
        assert_eq!(stalled.verdict, QuorumVerdict::Pending);
    }

    #[test]
    fn test_groups_by_content_identity() {
        let buffer = NodeTransactionBuffer::new();
        buffer.insert_batch("a", vec![tx(1, 1)], 10);
        buffer.insert_batch("b", vec![tx(1, 1)], 10);
        buffer.insert_batch("c", vec![tx(1, 9)], 10);
        let weighting = weighting(&[("a", 1), ("b", 1), ("c", 1)], 10);
        let builder = QuorumExtensionBuilder::new(&buffer, &weighting, 100);

        let ranked = builder.find_most_trusted(1);
        let best = ranked.best.unwrap();
        assert_eq!(best.aggregated_trust, TrustWeight::whole(2));
        assert_eq!(best.transaction.accumulator, [1u8; 32]);
        assert_eq!(ranked.total_trust_committed_by_nodes, TrustWeight::whole(3));
        assert_eq!(ranked.inconsistent_node_names, vec!["c".to_string()]);
    }

    #[test]
    fn test_fork_with_no_majority_is_lost() {
        let buffer = NodeTransactionBuffer::new();
        buffer.insert_batch("a", vec![tx(1, 1)], 10);
        buffer.insert_batch("b", vec![tx(1, 2)], 10);
        buffer.insert_batch("c", vec![tx(1, 3)], 10);
        let weighting = weighting(&[("a", 1), ("b", 1), ("c", 1)], 10);

        let extension = QuorumExtensionBuilder::new(&buffer, &weighting, 100).build(0);
        assert!(extension.is_empty());
        assert_eq!(extension.stalled.unwrap().verdict, QuorumVerdict::Lost);
    }

    #[test]
    fn test_batch_size_caps_extension() {
        let buffer = NodeTransactionBuffer::new();
        for node in ["a", "b"] {
            buffer.insert_batch(node, (1..=10).map(|v| tx(v, v as u8)).collect(), 100);
        }
        let weighting = weighting(&[("a", 1), ("b", 1)], 10);

        let extension = QuorumExtensionBuilder::new(&buffer, &weighting, 4).build(0);
        assert_eq!(extension.len(), 4);
        assert!(extension.stalled.is_none());
        let versions: Vec<_> = extension
            .into_transactions()
            .iter()
            .map(|t| t.state_version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_exact_threshold_is_accepted() {
        let config = LedgerConfirmationConfig {
            commit_requires_node_quorum_trust_proportion: QuorumProportion::from_millionths(
                550_000,
            ),
            ..LedgerConfirmationConfig::default()
        };
        let buffer = NodeTransactionBuffer::new();
        buffer.insert_batch("a", vec![tx(1, 1)], 10);
        let weighting = weighting_at(&config, &[("a", 55, 10), ("b", 45, 10)], 0);

        let extension = QuorumExtensionBuilder::new(&buffer, &weighting, 10).build(0);
        assert_eq!(extension.len(), 1);
        assert_eq!(
            extension.accepted[0].claim.aggregated_trust,
            TrustWeight::whole(55)
        );
    }

    #[test]
    fn test_split_synced_nodes_with_lagging_voter_is_unknown() {
        let config = LedgerConfirmationConfig {
            sufficiently_synced_state_version_threshold: 10,
            ..LedgerConfirmationConfig::default()
        };
        let buffer = NodeTransactionBuffer::new();
        buffer.insert_batch("a", vec![tx(101, 1)], 10);
        buffer.insert_batch("b", vec![tx(101, 2)], 10);
        let weighting =
            weighting_at(&config, &[("a", 1, 110), ("b", 1, 110), ("c", 1, 50)], 100);
        assert_eq!(weighting.sufficiently_synced_nodes, 2);

        let extension = QuorumExtensionBuilder::new(&buffer, &weighting, 10).build(100);
        assert!(extension.is_empty());
        let stalled = extension.stalled.unwrap();
        assert_eq!(stalled.state_version, 101);
        assert_eq!(stalled.total_trust_committed_by_nodes, TrustWeight::whole(2));
        assert_eq!(stalled.verdict, QuorumVerdict::Unknown);
    }
}
