//! Accrual ledger: balances that grow linearly at a per-account rate.
//!
//! `balance(t) = principal × (PRECISION + rate × (t − last_sync)) / PRECISION`
//!
//! Interest is reported lazily by [`AccrualLedger::balance_of`] and only
//! folded into the stored principal ("materialized") at the start of a
//! mint, burn or transfer. An account's rate is fixed at its first credit;
//! the partition-wide rate offered to new accounts may only go down.
//!
//! This crate handles:
//! - Fixed-point accrual with a 256-bit intermediate product
//! - Mint / burn / transfer with first-credit rate assignment and inheritance
//! - The global rate ratchet and its change history
//! - Capability checks on every gated entry point
//! - Snapshots and persistence through `accrue-store`

pub mod account;
pub mod auth;
pub mod error;
pub mod fixed;
pub mod ledger;
pub mod rate;
pub mod snapshot;

pub use account::Account;
pub use auth::{Authority, Capability, Principal};
pub use error::LedgerError;
pub use ledger::{AccrualLedger, Credit, Debit};
pub use rate::{RateChange, RateRegistry};
pub use snapshot::{AccountSnapshot, LedgerSnapshot};
