//! # Consistency Validation
//!
//! Last line of defence before a quorum extension reaches persistence:
//! checks the run is an unbroken +1 chain from the committed tip, that every
//! user transaction's declared hash matches its payload, and builds the
//! summary of each transaction from its parent.

use chrono::{DateTime, TimeZone, Utc};
use shared_types::{
    payload_hash_of, short_hex, CommittedTransaction, StateVersion, TransactionOrigin,
    TransactionSummary,
};

use crate::error::{ConfirmationError, ConfirmationResult};

/// A validated transaction and the summary derived for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedTransaction {
    pub transaction: CommittedTransaction,
    pub summary: TransactionSummary,
}

/// A validated, contiguous run of transactions directly following
/// `parent_summary`, ready to be handed to persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsistentLedgerExtension {
    pub parent_summary: TransactionSummary,
    pub transactions: Vec<ValidatedTransaction>,
}

impl ConsistentLedgerExtension {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Summary of the last transaction, or the parent for an empty extension.
    pub fn latest_summary(&self) -> &TransactionSummary {
        self.transactions
            .last()
            .map(|t| &t.summary)
            .unwrap_or(&self.parent_summary)
    }

    pub fn final_state_version(&self) -> StateVersion {
        self.latest_summary().state_version
    }

    /// `(state_version, accumulator)` of every transaction, in order.
    pub fn accumulators(&self) -> impl Iterator<Item = (StateVersion, shared_types::Hash)> + '_ {
        self.transactions
            .iter()
            .map(|t| (t.summary.state_version, t.summary.accumulator))
    }
}

/// Validates candidate extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyValidator;

impl ConsistencyValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `transactions` as the run following `parent`.
    ///
    /// `now` caps the normalized round timestamps.
    pub fn validate(
        &self,
        parent: &TransactionSummary,
        transactions: Vec<CommittedTransaction>,
        now: DateTime<Utc>,
    ) -> ConfirmationResult<ConsistentLedgerExtension> {
        let mut validated = Vec::with_capacity(transactions.len());
        let mut current_parent = parent.clone();

        for transaction in transactions {
            assert_child_consistent(current_parent.state_version, transaction.state_version)?;
            assert_payload_hash_correct(&transaction)?;

            let summary = summarise(&current_parent, &transaction, now);
            current_parent = summary.clone();
            validated.push(ValidatedTransaction {
                transaction,
                summary,
            });
        }

        Ok(ConsistentLedgerExtension {
            parent_summary: parent.clone(),
            transactions: validated,
        })
    }
}

/// A child must sit exactly one state version above its parent.
pub fn assert_child_consistent(
    previous: StateVersion,
    actual: StateVersion,
) -> ConfirmationResult<()> {
    if previous.checked_add(1) != Some(actual) {
        return Err(ConfirmationError::InvalidLedgerCommit { previous, actual });
    }
    Ok(())
}

/// User transactions must carry a payload whose double SHA-256 matches the
/// declared payload hash.
pub fn assert_payload_hash_correct(transaction: &CommittedTransaction) -> ConfirmationResult<()> {
    if transaction.origin != TransactionOrigin::User {
        return Ok(());
    }

    let payload = transaction
        .payload
        .as_deref()
        .ok_or_else(|| ConfirmationError::InconsistentLedger {
            state_version: transaction.state_version,
            reason: "user transaction is missing its payload".to_string(),
        })?;

    let computed = payload_hash_of(payload);
    if computed != transaction.payload_hash {
        return Err(ConfirmationError::InconsistentLedger {
            state_version: transaction.state_version,
            reason: format!(
                "declared payload hash {} does not match computed {}",
                short_hex(&transaction.payload_hash),
                short_hex(&computed)
            ),
        });
    }
    Ok(())
}

/// Derive a transaction's summary from its parent's.
///
/// An epoch change makes the transaction the first of its epoch. A round
/// timestamp of zero is not a real timestamp and the parent's is kept. The
/// normalized timestamp never moves backwards and never passes `now`.
pub fn summarise(
    parent: &TransactionSummary,
    transaction: &CommittedTransaction,
    now: DateTime<Utc>,
) -> TransactionSummary {
    let is_start_of_epoch = transaction.new_epoch.is_some();
    let is_start_of_round = transaction.new_round.is_some();

    let round_timestamp = transaction
        .new_round
        .filter(|r| r.timestamp_ms != 0)
        .and_then(|r| Utc.timestamp_millis_opt(r.timestamp_ms).single())
        .unwrap_or(parent.round_timestamp);

    let normalized_round_timestamp = if round_timestamp < parent.normalized_round_timestamp {
        parent.normalized_round_timestamp
    } else if round_timestamp > now {
        now
    } else {
        round_timestamp
    };

    TransactionSummary {
        state_version: transaction.state_version,
        epoch: transaction.new_epoch.unwrap_or(parent.epoch),
        round_in_epoch: transaction
            .new_round
            .map(|r| r.round_in_epoch)
            .unwrap_or(parent.round_in_epoch),
        index_in_epoch: if is_start_of_epoch {
            0
        } else {
            parent.index_in_epoch + 1
        },
        is_start_of_epoch,
        is_start_of_round,
        payload_hash: transaction.payload_hash,
        intent_hash: transaction.intent_hash,
        accumulator: transaction.accumulator,
        round_timestamp,
        normalized_round_timestamp,
    }
}
