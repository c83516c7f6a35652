//! Vault: converts an underlying asset into ledger credits and back.

use std::sync::{Mutex, MutexGuard};

use accrue_ledger::{Authority, Capability, Credit, LedgerError};
use accrue_types::{AccountId, Quantity};

use crate::partition::{counters, Partition};
use crate::PartitionError;

/// Holds the underlying reserve backing one partition's ledger.
///
/// Deposits add to the reserve and mint 1:1 at the current global rate.
/// Redemptions burn and release the same amount of underlying. Interest is
/// paid out of reserve top-ups via [`fund_reserve`](Self::fund_reserve), so
/// a redemption can outrun the reserve; it then fails before the burn.
pub struct Vault {
    authority: Authority,
    reserve: Mutex<u128>,
}

impl Vault {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            authority: Authority::service(name, [Capability::Mint, Capability::Burn]),
            reserve: Mutex::new(0),
        }
    }

    pub fn reserve(&self) -> Result<u128, PartitionError> {
        Ok(*self.lock()?)
    }

    /// Add underlying without minting anything.
    pub fn fund_reserve(&self, amount: u128) -> Result<u128, PartitionError> {
        let mut reserve = self.lock()?;
        *reserve = reserve
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(*reserve)
    }

    /// Take `amount` of underlying and credit it to `account`.
    pub fn deposit(
        &self,
        partition: &Partition,
        account: &AccountId,
        amount: u128,
    ) -> Result<Credit, PartitionError> {
        let mut reserve = self.lock()?;
        let new_reserve = reserve
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let credit = partition.with_ledger(|l, now| {
            let rate = l.global_rate();
            Ok(l.mint(&self.authority, account, amount, rate, now)?)
        })?;
        *reserve = new_reserve;
        partition.stats.increment(counters::MINTS);
        tracing::debug!(account = %account, amount, reserve = *reserve, "vault deposit");
        Ok(credit)
    }

    /// Burn `quantity` from `account` and release that much underlying.
    ///
    /// Returns the amount released.
    pub fn redeem(
        &self,
        partition: &Partition,
        account: &AccountId,
        quantity: Quantity,
    ) -> Result<u128, PartitionError> {
        let mut reserve = self.lock()?;
        let available = *reserve;
        let result = partition.with_ledger(|l, now| {
            let balance = l.balance_of_checked(account, now)?;
            let needed = quantity.resolve(balance);
            if needed > balance {
                return Err(LedgerError::InsufficientBalance {
                    needed,
                    available: balance,
                }
                .into());
            }
            if needed > available {
                return Err(PartitionError::ReserveShortfall { needed, available });
            }
            Ok(l.burn(&self.authority, account, quantity, now)?.amount)
        });
        match result {
            Ok(released) => {
                *reserve -= released;
                partition.stats.increment(counters::BURNS);
                tracing::debug!(account = %account, released, reserve = *reserve, "vault redemption");
                Ok(released)
            }
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "vault redemption rejected");
                Err(e)
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, u128>, PartitionError> {
        self.reserve.lock().map_err(|_| PartitionError::Poisoned)
    }
}
