//! Fundamental types for the accrual ledger.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account identifiers, partition identifiers, timestamps and the clock
//! abstraction, fixed-point constants, and debit quantities.

pub mod account;
pub mod amount;
pub mod error;
pub mod partition;
pub mod time;

pub use account::AccountId;
pub use amount::{Quantity, PRECISION};
pub use error::TypesError;
pub use partition::PartitionId;
pub use time::{Clock, SystemClock, Timestamp};
