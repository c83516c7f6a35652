//! Abstract storage traits for the accrual ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The ledger depends only on the traits and serializes its own types.

pub mod error;
pub mod ledger;

pub use error::StoreError;
pub use ledger::{LedgerBatch, LedgerStore};
