//! # lg-01-ledger-confirmation
//!
//! Trust-weighted confirmation of a ledger reported by several full nodes.
//!
//! ## Overview
//!
//! Each configured node reports its ledger tip and streams the committed
//! transactions it holds. This subsystem:
//! - **Buffers** reported transactions per node, under count and byte ceilings
//! - **Weights** nodes by configured trust, counting only sufficiently synced ones
//! - **Walks** state versions above the committed tip, accepting a transaction
//!   once the trust behind it reaches the quorum threshold
//! - **Validates** the accepted extension (parent linkage, payload hashes)
//!   before handing it to the ledger extender
//! - **Cross-checks** historical node tips against committed accumulators
//!
//! ## Architecture
//!
//! ```text
//! Node workers ──submit status / transactions──→ Confirmation (lg-01)
//!                                                      │
//!                      ConfirmationWorker (tick) ──────┤
//!                                                      ├── commit_transactions ──→ LedgerExtender
//!                                                      │
//!                                                      └── ConfirmationEvent ──→ Observers
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use lg_01_ledger_confirmation::{
//!     ConfirmationWorker, LedgerConfirmationApi, LedgerConfirmationService,
//!     TomlConfigProvider, TracingObserver,
//! };
//!
//! let config = Arc::new(TomlConfigProvider::load("gateway.toml")?);
//! let service = Arc::new(LedgerConfirmationService::new(
//!     extender,
//!     config.clone(),
//!     vec![Arc::new(TracingObserver)],
//! ));
//!
//! service.submit_node_network_status("node-a", tip, Some(accumulator), target);
//! service.submit_transactions_from_node("node-a", transactions, response_size)?;
//!
//! let worker = ConfirmationWorker::new(service.clone(), tick_interval);
//! worker.run(cancel).await;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod worker;

pub use adapters::{
    BroadcastObserver, InMemoryLedgerExtender, MetricsObserver, RecordingObserver,
    StaticConfigProvider, TomlConfigProvider, TracingObserver,
};
pub use config::{GatewayConfig, LedgerConfirmationConfig, NodeRecord};
pub use domain::{
    AccumulatorCache, ConsistentLedgerExtension, NodeTipStatus, QuorumExtension,
    QuorumProportion, QuorumRequirement, QuorumVerdict, TransactionsRequested, TrustThreshold,
    TrustWeight,
};
pub use error::{ConfirmationError, ConfirmationResult};
pub use events::{CommitSummary, ConfirmationEvent, MetricStatus};
pub use ports::inbound::{LedgerConfirmationApi, TickOutcome};
pub use ports::outbound::{CommitReport, ConfigProvider, ConfirmationObserver, LedgerExtender};
pub use service::LedgerConfirmationService;
pub use worker::{ConfirmationWorker, WorkerStats};
