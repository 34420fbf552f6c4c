//! Shared fixtures for the ledger confirmation integration tests.

#![allow(dead_code)]

use lg_01_ledger_confirmation::{
    ConfirmationObserver, GatewayConfig, InMemoryLedgerExtender, LedgerConfirmationApi,
    LedgerConfirmationService, NodeRecord, RecordingObserver, StaticConfigProvider, TrustWeight,
};
use shared_types::{
    payload_hash_of, pre_genesis_summary, CommittedTransaction, Hash, StateVersion,
    TransactionOrigin, TransactionSummary,
};
use std::sync::Arc;

pub type Service = LedgerConfirmationService<InMemoryLedgerExtender, StaticConfigProvider>;

pub struct Harness {
    pub service: Arc<Service>,
    pub extender: Arc<InMemoryLedgerExtender>,
    pub config: Arc<StaticConfigProvider>,
    pub events: Arc<RecordingObserver>,
}

impl Harness {
    pub fn committed_state_version(&self) -> StateVersion {
        self.extender.top().state_version
    }

    /// Report `node` as synced to `tip` and buffer its transactions.
    pub fn report(&self, node: &str, tip: StateVersion, transactions: Vec<CommittedTransaction>) {
        self.service
            .submit_node_network_status(node, tip, None, tip);
        let count = transactions.len() as u64;
        self.service
            .submit_transactions_from_node(node, transactions, count * 100)
            .unwrap();
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.events.names().iter().position(|n| *n == name)
    }
}

pub fn nodes(weights: &[(&str, f64)]) -> Vec<NodeRecord> {
    weights
        .iter()
        .map(|(n, w)| NodeRecord::new(*n, TrustWeight::try_from(*w).unwrap()))
        .collect()
}

pub fn harness(weights: &[(&str, f64)]) -> Harness {
    harness_with(GatewayConfig::with_nodes(nodes(weights)), pre_genesis_summary())
}

pub fn harness_with(config: GatewayConfig, top: TransactionSummary) -> Harness {
    let extender = Arc::new(InMemoryLedgerExtender::with_top(top));
    let config = Arc::new(StaticConfigProvider::new(config));
    let events = Arc::new(RecordingObserver::new());
    let observers: Vec<Arc<dyn ConfirmationObserver>> = vec![events.clone()];
    let service = Arc::new(LedgerConfirmationService::new(
        extender.clone(),
        config.clone(),
        observers,
    ));
    Harness {
        service,
        extender,
        config,
        events,
    }
}

pub fn summary_at(state_version: StateVersion) -> TransactionSummary {
    TransactionSummary {
        state_version,
        ..pre_genesis_summary()
    }
}

/// Accumulator of the `fork`-th history at `state_version`.
pub fn accumulator(state_version: StateVersion, fork: u8) -> Hash {
    let mut hash = [fork; 32];
    hash[..8].copy_from_slice(&state_version.to_be_bytes());
    hash
}

/// A well-formed user transaction on history `fork`.
pub fn user_tx(state_version: StateVersion, fork: u8) -> CommittedTransaction {
    let mut payload = state_version.to_be_bytes().to_vec();
    payload.push(fork);
    CommittedTransaction {
        state_version,
        accumulator: accumulator(state_version, fork),
        payload_hash: payload_hash_of(&payload),
        intent_hash: Some([fork; 32]),
        origin: TransactionOrigin::User,
        payload: Some(payload),
        new_epoch: None,
        new_round: None,
    }
}

pub fn user_txs(
    versions: std::ops::RangeInclusive<StateVersion>,
    fork: u8,
) -> Vec<CommittedTransaction> {
    versions.map(|v| user_tx(v, fork)).collect()
}
