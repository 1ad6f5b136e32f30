//! Two-person trip expense ledger.
//!
//! Library crate exposing the pure balance engine and data model for use
//! by the HTTP server binary and the integration tests. The engine takes
//! snapshots of participants, expenses and exchange rates and derives
//! balances; it performs no I/O itself.

pub mod balance;
pub mod currency;
pub mod error;
pub mod schemas;
pub mod stats;
