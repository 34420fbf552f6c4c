//! Ports module for the ledger confirmation subsystem

pub mod inbound;
pub mod outbound;

pub use inbound::{LedgerConfirmationApi, TickOutcome};
pub use outbound::{CommitReport, ConfigProvider, ConfirmationObserver, LedgerExtender};
