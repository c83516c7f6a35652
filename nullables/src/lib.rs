//! Nullable infrastructure for deterministic testing.
//!
//! The clock, the ledger store, and the bridge transport are all reached
//! through traits. This crate provides in-memory implementations that can
//! be driven step by step from a test and never touch the filesystem or
//! network.

pub mod clock;
pub mod store;
pub mod transport;

pub use clock::NullClock;
pub use store::NullLedgerStore;
pub use transport::NullTransport;
