//! # Shared Types Crate
//!
//! Ledger entities shared by the node workers, the confirmation engine and
//! the persistence layer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate ledger type is defined here.
//! - **Untrusted input**: `CommittedTransaction` is a node's *claim*; only a
//!   `TransactionSummary` produced after validation describes the ledger.

pub mod entities;

pub use entities::*;
