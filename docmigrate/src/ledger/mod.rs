//! Persistence of applied-version records.
//!
//! The [`VersionLedgerProvider`] trait is the storage contract, and
//! [`VersionLedger`] is the cloneable handle the migrator works with.
//! [`memory`] ships an in-memory document database whose collections can be
//! used as ledgers, suitable for tests and embedded use.

pub mod memory;
mod version_ledger;

pub use version_ledger::*;
