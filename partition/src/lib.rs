//! Partition runtime.
//!
//! A [`Partition`] owns one accrual ledger behind a lock and drives it with
//! a [`Clock`](accrue_types::Clock). It persists through an optional
//! [`LedgerStore`](accrue_store::LedgerStore), moves value to other
//! partitions through its bridge endpoint and a
//! [`BridgeTransport`](accrue_bridge::BridgeTransport), and keeps operation
//! counters. The [`Vault`] sits in front of it as the deposit and
//! redemption collaborator.

pub mod config;
pub mod error;
pub mod partition;
pub mod vault;

pub use config::PartitionConfig;
pub use error::PartitionError;
pub use partition::{counters, Partition, SharedStore};
pub use vault::Vault;
