//! Gateway configuration
//!
//! Read fresh by the confirmation loop at the start of every tick, so node
//! trust weights and quorum parameters can change without a restart.
//!
//! # Config File Format
//!
//! ```toml
//! [ledger_confirmation]
//! max_commit_batch_size = 1000
//! sufficiently_synced_state_version_threshold = 1000
//! commit_requires_node_quorum_trust_proportion = 0.51
//! only_use_sufficiently_synced_nodes_for_quorum = true
//! max_transaction_pipeline_size_per_node = 3000
//! max_estimated_transaction_pipeline_byte_size_per_node = 52428800
//! delay_between_large_batches_ms = 0
//! large_batch_size_to_add_delay = 500
//!
//! [[nodes]]
//! name = "node-1"
//! trust_weighting = 1.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::domain::{QuorumProportion, TrustWeight};
use crate::error::{ConfirmationError, ConfirmationResult};

/// Quorum, pipeline and pacing parameters of the confirmation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfirmationConfig {
    /// Maximum number of transactions committed in one tick
    pub max_commit_batch_size: u64,
    /// A node whose tip is within this distance of the committed tip counts
    /// as sufficiently synced
    pub sufficiently_synced_state_version_threshold: u64,
    /// Proportion of trust that must agree on a transaction.
    ///
    /// Must be a strict majority: at 0.5 or below two conflicting histories
    /// can each reach quorum at the same state version.
    pub commit_requires_node_quorum_trust_proportion: QuorumProportion,
    /// Compute the quorum over sufficiently synced nodes only
    pub only_use_sufficiently_synced_nodes_for_quorum: bool,
    /// How far ahead of the committed tip a node is asked to fetch
    pub max_transaction_pipeline_size_per_node: u64,
    /// Per-node ceiling on estimated buffered bytes
    pub max_estimated_transaction_pipeline_byte_size_per_node: u64,
    /// Pause after a large batch (0 disables)
    pub delay_between_large_batches_ms: u64,
    /// Batches of at least this many transactions count as large
    pub large_batch_size_to_add_delay: u64,
    /// Capacity of the committed accumulator cache
    pub accumulator_cache_capacity: usize,
    /// Interval between confirmation ticks
    pub tick_interval_ms: u64,
}

impl Default for LedgerConfirmationConfig {
    fn default() -> Self {
        Self {
            max_commit_batch_size: 1000,
            sufficiently_synced_state_version_threshold: 1000,
            commit_requires_node_quorum_trust_proportion: QuorumProportion::from_millionths(510_000),
            only_use_sufficiently_synced_nodes_for_quorum: true,
            max_transaction_pipeline_size_per_node: 3000,
            max_estimated_transaction_pipeline_byte_size_per_node: 50 * 1024 * 1024,
            delay_between_large_batches_ms: 0,
            large_batch_size_to_add_delay: 500,
            accumulator_cache_capacity: 2000,
            tick_interval_ms: 200,
        }
    }
}

impl LedgerConfirmationConfig {
    pub fn delay_between_large_batches(&self) -> Duration {
        Duration::from_millis(self.delay_between_large_batches_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Whether a batch of `committed` transactions should be followed by a pause.
    pub fn should_delay_after(&self, committed: u64) -> bool {
        self.delay_between_large_batches_ms > 0 && committed >= self.large_batch_size_to_add_delay
    }
}

/// A configured full node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(default = "default_trust_weighting")]
    pub trust_weighting: TrustWeight,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub disabled_for_transaction_indexing: bool,
}

fn default_trust_weighting() -> TrustWeight {
    TrustWeight::whole(1)
}

fn default_enabled() -> bool {
    true
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, trust_weighting: TrustWeight) -> Self {
        Self {
            name: name.into(),
            trust_weighting,
            enabled: true,
            disabled_for_transaction_indexing: false,
        }
    }

    /// Whether this node's reports count towards the quorum.
    pub fn is_voter(&self) -> bool {
        self.enabled && !self.disabled_for_transaction_indexing
    }
}

/// Full gateway configuration: engine parameters plus the node registry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub ledger_confirmation: LedgerConfirmationConfig,
    pub nodes: Vec<NodeRecord>,
}

impl GatewayConfig {
    pub fn with_nodes(nodes: Vec<NodeRecord>) -> Self {
        Self {
            ledger_confirmation: LedgerConfirmationConfig::default(),
            nodes,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfirmationResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfirmationError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Nodes whose reports count towards the quorum.
    pub fn voting_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(|n| n.is_voter())
    }

    pub fn validate(&self) -> ConfirmationResult<()> {
        let lc = &self.ledger_confirmation;
        let proportion = lc.commit_requires_node_quorum_trust_proportion;
        if proportion <= QuorumProportion::HALF || proportion > QuorumProportion::ONE {
            return Err(config_error(format!(
                "commit_requires_node_quorum_trust_proportion must be in (0.5, 1], got {proportion}"
            )));
        }
        if lc.max_commit_batch_size == 0 {
            return Err(config_error("max_commit_batch_size must be positive"));
        }
        if lc.max_transaction_pipeline_size_per_node == 0 {
            return Err(config_error(
                "max_transaction_pipeline_size_per_node must be positive",
            ));
        }
        if lc.accumulator_cache_capacity == 0 {
            return Err(config_error("accumulator_cache_capacity must be positive"));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(config_error(format!("duplicate node name {}", node.name)));
            }
        }
        Ok(())
    }
}

fn config_error(reason: impl Into<String>) -> ConfirmationError {
    ConfirmationError::Config {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfirmationConfig::default();
        assert_eq!(config.max_commit_batch_size, 1000);
        assert_eq!(
            config.commit_requires_node_quorum_trust_proportion,
            QuorumProportion::from_millionths(510_000)
        );
        assert!(config.only_use_sufficiently_synced_nodes_for_quorum);
        assert_eq!(
            config.max_estimated_transaction_pipeline_byte_size_per_node,
            52_428_800
        );
        assert!(!config.should_delay_after(10_000));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [ledger_confirmation]
            commit_requires_node_quorum_trust_proportion = 0.67
            delay_between_large_batches_ms = 50

            [[nodes]]
            name = "node-1"
            trust_weighting = 2.0

            [[nodes]]
            name = "node-2"
            enabled = false
        "#;
        let config = GatewayConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.ledger_confirmation.commit_requires_node_quorum_trust_proportion,
            QuorumProportion::from_millionths(670_000)
        );
        assert_eq!(config.ledger_confirmation.max_commit_batch_size, 1000);
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].trust_weighting, TrustWeight::whole(2));
        assert_eq!(config.nodes[1].trust_weighting, TrustWeight::whole(1));
        assert_eq!(config.voting_nodes().count(), 1);
        assert!(config.ledger_confirmation.should_delay_after(500));
        assert!(!config.ledger_confirmation.should_delay_after(499));
    }

    #[test]
    fn test_rejects_invalid_proportion() {
        let mut config = GatewayConfig::default();
        config.ledger_confirmation.commit_requires_node_quorum_trust_proportion =
            QuorumProportion::from_millionths(0);
        assert!(matches!(
            config.validate(),
            Err(ConfirmationError::Config { .. })
        ));
        config.ledger_confirmation.commit_requires_node_quorum_trust_proportion =
            QuorumProportion::from_millionths(1_500_000);
        assert!(config.validate().is_err());
        config.ledger_confirmation.commit_requires_node_quorum_trust_proportion =
            QuorumProportion::ONE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_proportion_without_strict_majority() {
        let mut config = GatewayConfig::default();
        config.ledger_confirmation.commit_requires_node_quorum_trust_proportion =
            QuorumProportion::HALF;
        assert!(matches!(
            config.validate(),
            Err(ConfirmationError::Config { .. })
        ));
        config.ledger_confirmation.commit_requires_node_quorum_trust_proportion =
            QuorumProportion::from_millionths(500_001);
        assert!(config.validate().is_ok());

        let toml = r#"
            [ledger_confirmation]
            commit_requires_node_quorum_trust_proportion = 0.4
        "#;
        assert!(GatewayConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_rejects_bad_nodes() {
        let negative = r#"
            [[nodes]]
            name = "a"
            trust_weighting = -1.0
        "#;
        assert!(matches!(
            GatewayConfig::from_toml_str(negative),
            Err(ConfirmationError::Config { .. })
        ));

        let not_a_number = r#"
            [[nodes]]
            name = "a"
            trust_weighting = nan
        "#;
        assert!(GatewayConfig::from_toml_str(not_a_number).is_err());

        let config = GatewayConfig::with_nodes(vec![
            NodeRecord::new("a", TrustWeight::whole(1)),
            NodeRecord::new("a", TrustWeight::whole(1)),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decimal_weights_parse_exactly() {
        let toml = r#"
            [[nodes]]
            name = "a"
            trust_weighting = 0.1

            [[nodes]]
            name = "b"
            trust_weighting = 0.2
        "#;
        let config = GatewayConfig::from_toml_str(toml).unwrap();
        let total: TrustWeight = config.nodes.iter().map(|n| n.trust_weighting).sum();
        assert_eq!(total, TrustWeight::from_units(300_000));
    }

    #[test]
    fn test_indexing_disabled_node_is_not_a_voter() {
        let mut node = NodeRecord::new("a", TrustWeight::whole(1));
        assert!(node.is_voter());
        node.disabled_for_transaction_indexing = true;
        assert!(!node.is_voter());
    }
}
