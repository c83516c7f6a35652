//! LMDB storage backend for accrual ledger partitions.
//!
//! Implements [`accrue_store::ledger::LedgerStore`] using the `heed` LMDB
//! bindings. One environment holds two databases: account records keyed by
//! account id, and ledger-wide metadata.

pub mod environment;
pub mod error;
pub mod ledger;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use ledger::LmdbLedgerStore;
