//! # Core Ledger Entities
//!
//! Defines the ledger entities exchanged between the node workers, the
//! confirmation engine and the persistence layer.
//!
//! ## Clusters
//!
//! - **Node reports**: `CommittedTransaction`, `TransactionIdentity`
//! - **Committed ledger**: `TransactionSummary`, `SyncTarget`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte hash (payload hashes, intent hashes, accumulators).
pub type Hash = [u8; 32];

/// Position of a transaction in the canonical ledger.
///
/// State version 0 is the pre-genesis position: the first real transaction
/// lives at state version 1.
pub type StateVersion = u64;

/// The all-zero accumulator of the empty ledger.
pub const PRE_GENESIS_ACCUMULATOR: Hash = [0u8; 32];

/// Computes the payload hash of a raw transaction payload.
///
/// Payload hashes are double SHA-256, as reported by the node API.
pub fn payload_hash_of(payload: &[u8]) -> Hash {
    let first = Sha256::digest(payload);
    Sha256::digest(first).into()
}

/// Short hex rendering of a hash for log lines.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}

// =============================================================================
// NODE REPORTS
// =============================================================================

/// Who originated a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionOrigin {
    /// Submitted by a user: carries a raw payload whose hash must match.
    User,
    /// Produced by the protocol (round/epoch changes, validator updates).
    System,
}

/// Round change carried by a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundChange {
    /// New round number within the epoch.
    pub round_in_epoch: u64,
    /// Proposer timestamp of the new round. Zero means "not reported".
    pub timestamp_ms: i64,
}

/// A transaction as reported by a single full node.
///
/// Nodes are untrusted: nothing in this struct is believed until enough
/// trust agrees on it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    /// Resultant state version of this transaction.
    pub state_version: StateVersion,
    /// Ledger accumulator after applying this transaction.
    #[serde_as(as = "Bytes")]
    pub accumulator: Hash,
    /// Declared payload hash.
    #[serde_as(as = "Bytes")]
    pub payload_hash: Hash,
    /// Declared intent hash (user transactions only).
    pub intent_hash: Option<Hash>,
    /// Who originated the transaction.
    pub origin: TransactionOrigin,
    /// Raw payload, present for user transactions.
    pub payload: Option<Vec<u8>>,
    /// New epoch started by this transaction, if any.
    pub new_epoch: Option<u64>,
    /// New round started by this transaction, if any.
    pub new_round: Option<RoundChange>,
}

impl CommittedTransaction {
    /// The content the nodes must agree on for this position.
    pub fn identity(&self) -> TransactionIdentity {
        TransactionIdentity {
            accumulator: self.accumulator,
            payload_hash: self.payload_hash,
        }
    }

    /// Size of the raw payload in bytes (zero for system transactions).
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// Content identity of a reported transaction.
///
/// Two reports at the same state version with different identities mean at
/// least one of the reporting nodes is forked or corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionIdentity {
    pub accumulator: Hash,
    pub payload_hash: Hash,
}

// =============================================================================
// COMMITTED LEDGER
// =============================================================================

/// Summary of a committed (or about-to-be-committed) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub state_version: StateVersion,
    pub epoch: u64,
    pub round_in_epoch: u64,
    pub index_in_epoch: u64,
    pub is_start_of_epoch: bool,
    pub is_start_of_round: bool,
    pub payload_hash: Hash,
    pub intent_hash: Option<Hash>,
    pub accumulator: Hash,
    /// Round timestamp as reported by the proposer.
    pub round_timestamp: DateTime<Utc>,
    /// Round timestamp clamped to be monotonic and never in the future.
    pub normalized_round_timestamp: DateTime<Utc>,
}

/// Summary of the empty ledger.
pub fn pre_genesis_summary() -> TransactionSummary {
    TransactionSummary {
        state_version: 0,
        epoch: 0,
        round_in_epoch: 0,
        index_in_epoch: 0,
        is_start_of_epoch: false,
        is_start_of_round: false,
        payload_hash: [0u8; 32],
        intent_hash: None,
        accumulator: PRE_GENESIS_ACCUMULATOR,
        round_timestamp: DateTime::<Utc>::UNIX_EPOCH,
        normalized_round_timestamp: DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// Highest state version any node claims to have reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    pub target_state_version: StateVersion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_hash_is_double_sha256() {
        let once: [u8; 32] = Sha256::digest(b"payload").into();
        let twice: [u8; 32] = Sha256::digest(once).into();
        assert_eq!(payload_hash_of(b"payload"), twice);
        assert_ne!(payload_hash_of(b"payload"), once);
    }

    #[test]
    fn test_identity_distinguishes_content() {
        let tx = CommittedTransaction {
            state_version: 7,
            accumulator: [1u8; 32],
            payload_hash: [2u8; 32],
            intent_hash: None,
            origin: TransactionOrigin::System,
            payload: None,
            new_epoch: None,
            new_round: None,
        };
        let mut forked = tx.clone();
        forked.accumulator = [3u8; 32];

        assert_eq!(tx.identity(), tx.clone().identity());
        assert_ne!(tx.identity(), forked.identity());
    }

    #[test]
    fn test_pre_genesis_summary() {
        let summary = pre_genesis_summary();
        assert_eq!(summary.state_version, 0);
        assert_eq!(summary.accumulator, PRE_GENESIS_ACCUMULATOR);
        assert_eq!(summary.round_timestamp.timestamp(), 0);
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex(&[0xab; 32]), "abababababababab");
    }
}
