//! Fixed-point scale and debit quantities.
//!
//! Balances and rates are raw `u128` integers. Rates are fixed-point values
//! scaled by [`PRECISION`]: a rate of `PRECISION` grows a balance by 100% per
//! second.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point scale for accrual rates and accrual factors (1e18).
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// How much to debit from an account in a burn or transfer.
///
/// `Max` resolves to the account's full balance after its pending interest
/// has been materialized, so a full withdrawal never leaves dust behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Exact(u128),
    Max,
}

impl Quantity {
    /// Resolve against a materialized balance.
    pub fn resolve(self, balance: u128) -> u128 {
        match self {
            Self::Exact(amount) => amount,
            Self::Max => balance,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(amount) => write!(f, "{}", amount),
            Self::Max => write!(f, "max"),
        }
    }
}
