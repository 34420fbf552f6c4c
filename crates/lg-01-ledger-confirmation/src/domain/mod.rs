//! Domain layer for the ledger confirmation subsystem
//!
//! Pure algorithms (trust weighting, quorum walk, consistency checks) and
//! the concurrent structures the node workers write into.

pub mod accumulator_cache;
pub mod consistency;
pub mod node_tips;
pub mod quorum;
pub mod transaction_buffer;
pub mod trust;
pub mod weight;

pub use accumulator_cache::{AccumulatorCache, DEFAULT_ACCUMULATOR_CACHE_CAPACITY};
pub use consistency::{
    assert_child_consistent, assert_payload_hash_correct, summarise, ConsistencyValidator,
    ConsistentLedgerExtension, ValidatedTransaction,
};
pub use node_tips::{classify_tip, NodeTipRecord, NodeTipStatus, NodeTipTracker};
pub use quorum::{
    AcceptedPosition, MostTrustedTransaction, QuorumExtension, QuorumExtensionBuilder,
    QuorumVerdict, StalledPosition, TransactionClaim,
};
pub use transaction_buffer::{BufferedTransaction, NodeTransactionBuffer, TransactionsRequested};
pub use trust::{QuorumRequirement, TrustWeightingCalculator, TrustWeightingReport};
pub use weight::{InvalidTrustValue, QuorumProportion, TrustThreshold, TrustWeight, TRUST_SCALE};
