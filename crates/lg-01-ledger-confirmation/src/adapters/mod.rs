//! Adapters for the ledger confirmation subsystem
//!
//! Concrete implementations of the outbound ports.

pub mod config;
pub mod ledger_extender;
pub mod observers;

pub use config::{StaticConfigProvider, TomlConfigProvider};
pub use ledger_extender::InMemoryLedgerExtender;
pub use observers::{BroadcastObserver, MetricsObserver, RecordingObserver, TracingObserver};
