//! Per-account accrual state and the interest arithmetic.

use crate::error::LedgerError;
use crate::fixed::mul_div;
use accrue_types::{Timestamp, PRECISION};
use serde::{Deserialize, Serialize};

/// Accrual state for a single account.
///
/// `principal` is the materialized balance. Interest that has accrued since
/// `last_sync_time` is not part of it until [`Account::materialize`] runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Last-materialized balance, excluding pending interest.
    pub principal: u128,

    /// Growth per second, scaled by `PRECISION`. Zero until the account
    /// is first credited; reset to zero when the balance is fully debited.
    pub accrual_rate: u128,

    /// When pending interest was last folded into `principal`.
    pub last_sync_time: Timestamp,
}

impl Account {
    /// A fresh, never-credited account whose clock starts at `now`.
    pub fn opened_at(now: Timestamp) -> Self {
        Self {
            principal: 0,
            accrual_rate: 0,
            last_sync_time: now,
        }
    }

    /// Whether this account is indistinguishable from one that never existed.
    pub fn is_empty(&self) -> bool {
        self.principal == 0 && self.accrual_rate == 0
    }

    /// `PRECISION + rate × elapsed`. A `now` before the last sync accrues nothing.
    pub fn accrual_factor(&self, now: Timestamp) -> Option<u128> {
        let elapsed = self.last_sync_time.elapsed_since(now) as u128;
        self.accrual_rate.checked_mul(elapsed)?.checked_add(PRECISION)
    }

    /// Principal plus pending interest at `now`.
    pub fn balance_at(&self, now: Timestamp) -> Option<u128> {
        if self.principal == 0 {
            return Some(0);
        }
        let factor = self.accrual_factor(now)?;
        mul_div(self.principal, factor, PRECISION)
    }

    /// Interest accrued since the last sync and not yet materialized.
    pub fn pending_interest(&self, now: Timestamp) -> Option<u128> {
        self.balance_at(now)?.checked_sub(self.principal)
    }

    /// Fold pending interest into `principal` and move the clock to `now`.
    ///
    /// Returns the interest that was materialized. The clock never moves
    /// backwards.
    pub fn materialize(&mut self, now: Timestamp) -> Result<u128, LedgerError> {
        let balance = self.balance_at(now).ok_or(LedgerError::Overflow)?;
        let interest = balance - self.principal;
        self.principal = balance;
        if now > self.last_sync_time {
            self.last_sync_time = now;
        }
        Ok(interest)
    }
}
