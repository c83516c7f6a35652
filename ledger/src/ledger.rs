//! The accrual ledger for one partition.

use crate::account::Account;
use crate::auth::{Authority, Capability};
use crate::error::LedgerError;
use crate::rate::{RateChange, RateRegistry};
use accrue_store::{LedgerBatch, LedgerStore};
use accrue_types::{AccountId, Quantity, Timestamp};
use std::collections::HashMap;

const RATE_HISTORY_KEY: &[u8] = b"rate_history";

/// Outcome of a successful burn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debit {
    /// Principal actually destroyed (the full balance for `Quantity::Max`).
    pub amount: u128,
    /// The account's rate after materialization, before any reset.
    pub accrual_rate: u128,
    /// Interest materialized by this call.
    pub interest: u128,
}

/// Outcome of a successful mint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credit {
    pub amount: u128,
    /// The rate the account holds after the credit.
    pub accrual_rate: u128,
    /// Interest materialized by this call.
    pub interest: u128,
}

/// Per-partition ledger state: accounts, the global rate, and total principal.
///
/// Every mutating call materializes the accounts it touches first, works on
/// copies, and commits only once every check has passed, so a failed call
/// leaves no trace. Callers supply `now`; the ledger never reads a clock.
#[derive(Clone, Debug, Default)]
pub struct AccrualLedger {
    accounts: HashMap<AccountId, Account>,
    rates: RateRegistry,
    total_principal: u128,
}

impl AccrualLedger {
    /// Create an empty ledger offering `initial_rate` from `genesis`.
    pub fn new(initial_rate: u128, genesis: Timestamp) -> Self {
        Self {
            accounts: HashMap::new(),
            rates: RateRegistry::new(initial_rate, genesis),
            total_principal: 0,
        }
    }

    pub(crate) fn from_parts(
        accounts: HashMap<AccountId, Account>,
        rates: RateRegistry,
    ) -> Result<Self, LedgerError> {
        let mut total: u128 = 0;
        for account in accounts.values() {
            total = total
                .checked_add(account.principal)
                .ok_or(LedgerError::Overflow)?;
        }
        Ok(Self {
            accounts,
            rates,
            total_principal: total,
        })
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Balance including pending interest, without materializing it.
    ///
    /// Saturates at `u128::MAX`; use [`Self::balance_of_checked`] to detect
    /// overflow.
    pub fn balance_of(&self, account: &AccountId, now: Timestamp) -> u128 {
        self.balance_of_checked(account, now).unwrap_or(u128::MAX)
    }

    pub fn balance_of_checked(
        &self,
        account: &AccountId,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        match self.accounts.get(account) {
            Some(a) => a.balance_at(now).ok_or(LedgerError::Overflow),
            None => Ok(0),
        }
    }

    /// The account's rate; zero if it holds no rate.
    pub fn accrual_rate(&self, account: &AccountId) -> u128 {
        self.accounts.get(account).map_or(0, |a| a.accrual_rate)
    }

    /// When the account's interest was last materialized; the epoch for
    /// accounts the ledger does not hold.
    pub fn last_sync_time(&self, account: &AccountId) -> Timestamp {
        self.accounts
            .get(account)
            .map_or(Timestamp::EPOCH, |a| a.last_sync_time)
    }

    /// Materialized balance only.
    pub fn principal_of(&self, account: &AccountId) -> u128 {
        self.accounts.get(account).map_or(0, |a| a.principal)
    }

    pub fn account(&self, account: &AccountId) -> Option<&Account> {
        self.accounts.get(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &Account)> {
        self.accounts.iter()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Sum of every account's principal.
    pub fn total_principal(&self) -> u128 {
        self.total_principal
    }

    pub fn global_rate(&self) -> u128 {
        self.rates.current_rate()
    }

    pub fn rate_history(&self) -> &[RateChange] {
        self.rates.history()
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Credit `amount` to `account`.
    ///
    /// An account without a rate takes `rate_for_new_credit` as soon as it
    /// receives a positive amount; an account that already has a rate keeps
    /// it. The vault passes the global rate here, the bridge the rate
    /// carried in the payload.
    pub fn mint(
        &mut self,
        auth: &Authority,
        account: &AccountId,
        amount: u128,
        rate_for_new_credit: u128,
        now: Timestamp,
    ) -> Result<Credit, LedgerError> {
        auth.require(Capability::Mint)?;
        let (mut acct, interest) = self.touch(account, now)?;

        acct.principal = acct
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if acct.accrual_rate == 0 && amount > 0 {
            acct.accrual_rate = rate_for_new_credit;
        }
        let total = self
            .total_principal
            .checked_add(interest)
            .and_then(|t| t.checked_add(amount))
            .ok_or(LedgerError::Overflow)?;

        let credit = Credit {
            amount,
            accrual_rate: acct.accrual_rate,
            interest,
        };
        self.commit(account, acct);
        self.total_principal = total;
        tracing::debug!(
            account = %account,
            amount,
            interest,
            rate = credit.accrual_rate,
            "minted"
        );
        Ok(credit)
    }

    /// Destroy `quantity` of `account`'s balance.
    ///
    /// A full debit resets the account's rate, so its next credit is treated
    /// as a first credit.
    pub fn burn(
        &mut self,
        auth: &Authority,
        account: &AccountId,
        quantity: Quantity,
        now: Timestamp,
    ) -> Result<Debit, LedgerError> {
        auth.require(Capability::Burn)?;
        let (mut acct, interest) = self.touch(account, now)?;

        let amount = quantity.resolve(acct.principal);
        if amount > acct.principal {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: acct.principal,
            });
        }
        let accrual_rate = acct.accrual_rate;
        debit(&mut acct, amount);
        // total_principal >= acct.principal >= amount, so only the add can overflow.
        let total = self
            .total_principal
            .checked_add(interest)
            .ok_or(LedgerError::Overflow)?
            - amount;

        self.commit(account, acct);
        self.total_principal = total;
        tracing::debug!(account = %account, amount, interest, "burned");
        Ok(Debit {
            amount,
            accrual_rate,
            interest,
        })
    }

    /// Move `quantity` from `from` to `to`, returning the amount moved.
    ///
    /// A receiver without a rate inherits the sender's; a receiver that
    /// already has one keeps it. Both clocks move to `now`.
    pub fn transfer(
        &mut self,
        auth: &Authority,
        from: &AccountId,
        to: &AccountId,
        quantity: Quantity,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        auth.acts_for(from)?;
        let (mut src, src_interest) = self.touch(from, now)?;

        let amount = quantity.resolve(src.principal);
        if amount > src.principal {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: src.principal,
            });
        }

        if from == to {
            let total = self
                .total_principal
                .checked_add(src_interest)
                .ok_or(LedgerError::Overflow)?;
            self.commit(from, src);
            self.total_principal = total;
            return Ok(amount);
        }

        let (mut dst, dst_interest) = self.touch(to, now)?;
        if dst.accrual_rate == 0 && amount > 0 {
            dst.accrual_rate = src.accrual_rate;
        }
        dst.principal = dst
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        debit(&mut src, amount);
        let total = self
            .total_principal
            .checked_add(src_interest)
            .and_then(|t| t.checked_add(dst_interest))
            .ok_or(LedgerError::Overflow)?;

        self.commit(from, src);
        self.commit(to, dst);
        self.total_principal = total;
        tracing::debug!(from = %from, to = %to, amount, "transferred");
        Ok(amount)
    }

    /// Lower the rate offered to newly credited accounts.
    pub fn set_global_rate(
        &mut self,
        auth: &Authority,
        new_rate: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        auth.require(Capability::SetGlobalRate)?;
        let previous = self.rates.current_rate();
        self.rates.lower(new_rate, now)?;
        tracing::info!(previous, new_rate, at = %now, "global rate set");
        Ok(())
    }

    /// Materialize an account, returning the updated copy and the interest added.
    fn touch(&self, id: &AccountId, now: Timestamp) -> Result<(Account, u128), LedgerError> {
        let mut acct = self
            .accounts
            .get(id)
            .cloned()
            .unwrap_or_else(|| Account::opened_at(now));
        let interest = acct.materialize(now)?;
        Ok((acct, interest))
    }

    /// Store an account; empty accounts are dropped.
    fn commit(&mut self, id: &AccountId, acct: Account) {
        if acct.is_empty() {
            self.accounts.remove(id);
        } else {
            self.accounts.insert(id.clone(), acct);
        }
    }
}

fn debit(acct: &mut Account, amount: u128) {
    acct.principal -= amount;
    if acct.principal == 0 {
        acct.accrual_rate = 0;
    }
}

impl AccrualLedger {
    /// Build the batch that replaces everything a store holds for this
    /// ledger. Callers may add their own meta entries before applying it.
    pub fn store_batch(&self) -> Result<LedgerBatch, LedgerError> {
        let mut batch = LedgerBatch::replacing_accounts();

        let rate_bytes = bincode::serialize(self.rates.history())
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        batch.put_meta(RATE_HISTORY_KEY, rate_bytes);

        for (id, acct) in &self.accounts {
            let bytes =
                bincode::serialize(acct).map_err(|e| LedgerError::Serialization(e.to_string()))?;
            batch.put_account(id.clone(), bytes);
        }
        Ok(batch)
    }

    /// Persist all ledger state to a store in one batch.
    ///
    /// Accounts held by the store but no longer by the ledger are dropped by
    /// the same write.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), LedgerError> {
        store.apply_batch(self.store_batch()?)?;
        Ok(())
    }

    /// Restore ledger state from a store; `None` if nothing was ever saved.
    pub fn load_from_store(store: &dyn LedgerStore) -> Result<Option<Self>, LedgerError> {
        let rate_bytes = match store.get_meta(RATE_HISTORY_KEY)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let changes: Vec<RateChange> = bincode::deserialize(&rate_bytes)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let rates = RateRegistry::from_changes(changes)?;

        let mut accounts = HashMap::new();
        for (id, bytes) in store.iter_accounts()? {
            let acct: Account = bincode::deserialize(&bytes)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            accounts.insert(id, acct);
        }
        Self::from_parts(accounts, rates).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_types::PRECISION;

    /// 5e-11 per second, scaled.
    const RATE_5E_11: u128 = 50_000_000;
    const UNIT: u128 = PRECISION;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn minter() -> Authority {
        Authority::service("vault", [Capability::Mint, Capability::Burn])
    }

    fn rate_setter() -> Authority {
        Authority::service("rate-setter", [Capability::SetGlobalRate])
    }

    fn ledger_with(rate: u128) -> AccrualLedger {
        AccrualLedger::new(rate, t(0))
    }

    #[test]
    fn mint_assigns_rate_on_first_credit() {
        let mut ledger = ledger_with(RATE_5E_11);
        let alice = id("alice");
        let credit = ledger.mint(&minter(), &alice, 1_000, RATE_5E_11, t(10)).unwrap();
        assert_eq!(credit.accrual_rate, RATE_5E_11);
        assert_eq!(ledger.accrual_rate(&alice), RATE_5E_11);
        assert_eq!(ledger.principal_of(&alice), 1_000);
        assert_eq!(ledger.last_sync_time(&alice), t(10));
        assert_eq!(ledger.total_principal(), 1_000);
    }

    #[test]
    fn later_mint_keeps_first_rate() {
        let mut ledger = ledger_with(200);
        let alice = id("alice");
        ledger.mint(&minter(), &alice, 1_000, 200, t(0)).unwrap();
        ledger.set_global_rate(&rate_setter(), 100, t(1)).unwrap();
        ledger.mint(&minter(), &alice, 1_000, 100, t(1)).unwrap();
        assert_eq!(ledger.accrual_rate(&alice), 200);
    }

    #[test]
    fn mint_materializes_pending_interest_first() {
        let mut ledger = ledger_with(PRECISION / 100);
        let alice = id("alice");
        ledger.mint(&minter(), &alice, 10_000, PRECISION / 100, t(0)).unwrap();
        let credit = ledger.mint(&minter(), &alice, 500, PRECISION / 100, t(10)).unwrap();
        assert_eq!(credit.interest, 1_000);
        assert_eq!(ledger.principal_of(&alice), 11_500);
        assert_eq!(ledger.total_principal(), 11_500);
    }

    #[test]
    fn zero_mint_does_not_assign_rate() {
        let mut ledger = ledger_with(RATE_5E_11);
        let bob = id("bob");
        ledger.mint(&minter(), &bob, 0, RATE_5E_11, t(3)).unwrap();
        assert_eq!(ledger.accrual_rate(&bob), 0);
        assert_eq!(ledger.balance_of(&bob, t(100)), 0);
    }

    #[test]
    fn mint_without_capability_is_unauthorized() {
        let mut ledger = ledger_with(RATE_5E_11);
        let alice = id("alice");
        let result = ledger.mint(&Authority::account(alice.clone()), &alice, 1, 1, t(0));
        assert!(matches!(
            result,
            Err(LedgerError::Unauthorized {
                capability: Capability::Mint,
                ..
            })
        ));
        assert_eq!(ledger.total_principal(), 0);
    }

    #[test]
    fn linear_accrual_scenario() {
        let mut ledger = ledger_with(RATE_5E_11);
        let a = id("a");
        let deposit = 100_000 * UNIT;
        ledger.mint(&minter(), &a, deposit, ledger.global_rate(), t(0)).unwrap();

        let expected = deposit * RATE_5E_11 * 3600 / PRECISION;
        let b0 = ledger.balance_of(&a, t(0));
        let b1 = ledger.balance_of(&a, t(3600));
        let b2 = ledger.balance_of(&a, t(7200));
        assert_eq!(b0, deposit);
        assert_eq!(b1 - b0, expected);
        assert!((b2 - b1).abs_diff(b1 - b0) <= 1);
    }

    #[test]
    fn balance_of_does_not_materialize() {
        let mut ledger = ledger_with(PRECISION / 100);
        let alice = id("alice");
        ledger.mint(&minter(), &alice, 10_000, PRECISION / 100, t(0)).unwrap();
        assert_eq!(ledger.balance_of(&alice, t(10)), 11_000);
        assert_eq!(ledger.principal_of(&alice), 10_000);
        assert_eq!(ledger.last_sync_time(&alice), t(0));
    }

    #[test]
    fn burn_more_than_balance_fails_and_changes_nothing() {
        let mut ledger = ledger_with(PRECISION / 100);
        let alice = id("alice");
        ledger.mint(&minter(), &alice, 10_000, PRECISION / 100, t(0)).unwrap();
        let before = ledger.balance_of(&alice, t(10));

        match ledger.burn(&minter(), &alice, Quantity::Exact(20_000), t(10)) {
            Err(LedgerError::InsufficientBalance { needed, available }) => {
                assert_eq!(needed, 20_000);
                assert_eq!(available, 11_000);
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }
        assert_eq!(ledger.balance_of(&alice, t(10)), before);
        assert_eq!(ledger.principal_of(&alice), 10_000);
        assert_eq!(ledger.last_sync_time(&alice), t(0));
    }

    #[test]
    fn burn_max_takes_materialized_balance_and_resets_rate() {
        let mut ledger = ledger_with(PRECISION / 100);
        let alice = id("alice");
        ledger.mint(&minter(), &alice, 10_000, PRECISION / 100, t(0)).unwrap();
        let debit = ledger.burn(&minter(), &alice, Quantity::Max, t(10)).unwrap();
        assert_eq!(debit.amount, 11_000);
        assert_eq!(debit.interest, 1_000);
        assert_eq!(debit.accrual_rate, PRECISION / 100);
        assert_eq!(ledger.accrual_rate(&alice), 0);
        assert_eq!(ledger.balance_of(&alice, t(1_000)), 0);
        assert_eq!(ledger.total_principal(), 0);
        assert!(ledger.account(&alice).is_none());
    }

    #[test]
    fn burn_partial_keeps_rate() {
        let mut ledger = ledger_with(RATE_5E_11);
        let alice = id("alice");
        ledger.mint(&minter(), &alice, 1_000, RATE_5E_11, t(0)).unwrap();
        ledger.burn(&minter(), &alice, Quantity::Exact(400), t(0)).unwrap();
        assert_eq!(ledger.principal_of(&alice), 600);
        assert_eq!(ledger.accrual_rate(&alice), RATE_5E_11);
    }

    #[test]
    fn transfer_to_new_account_inherits_rate() {
        let rate = 50_000_000_000u128;
        let mut ledger = ledger_with(rate);
        let a = id("a");
        let c = id("c");
        ledger.mint(&minter(), &a, 1_000 * UNIT, rate, t(0)).unwrap();
        let half = ledger.balance_of(&a, t(100)) / 2;

        ledger
            .transfer(&Authority::account(a.clone()), &a, &c, Quantity::Exact(half), t(100))
            .unwrap();
        assert_eq!(ledger.accrual_rate(&c), rate);
        assert_eq!(ledger.accrual_rate(&a), rate);
        assert_eq!(ledger.principal_of(&c), half);
        assert_eq!(ledger.last_sync_time(&c), t(100));
    }

    #[test]
    fn transfer_to_rated_account_keeps_receiver_rate() {
        let mut ledger = ledger_with(300);
        let high = id("high");
        let low = id("low");
        ledger.mint(&minter(), &high, 1_000, 300, t(0)).unwrap();
        ledger.set_global_rate(&rate_setter(), 100, t(0)).unwrap();
        ledger.mint(&minter(), &low, 1_000, 100, t(0)).unwrap();

        ledger
            .transfer(&Authority::account(high.clone()), &high, &low, Quantity::Exact(500), t(0))
            .unwrap();
        assert_eq!(ledger.accrual_rate(&low), 100);

        ledger
            .transfer(&Authority::account(low.clone()), &low, &high, Quantity::Exact(500), t(0))
            .unwrap();
        assert_eq!(ledger.accrual_rate(&high), 300);
    }

    #[test]
    fn transfer_conserves_principal() {
        let mut ledger = ledger_with(PRECISION / 1000);
        let a = id("a");
        let b = id("b");
        ledger.mint(&minter(), &a, 50_000, PRECISION / 1000, t(0)).unwrap();
        ledger.mint(&minter(), &b, 20_000, PRECISION / 1000, t(0)).unwrap();
        let before = ledger.total_principal();

        ledger
            .transfer(&Authority::account(a.clone()), &a, &b, Quantity::Exact(10_000), t(0))
            .unwrap();
        ledger
            .transfer(&Authority::account(b.clone()), &b, &a, Quantity::Exact(5_000), t(0))
            .unwrap();
        assert_eq!(ledger.total_principal(), before);
        let sum: u128 = ledger.accounts().map(|(_, acct)| acct.principal).sum();
        assert_eq!(sum, before);
    }

    #[test]
    fn transfer_max_empties_sender() {
        let mut ledger = ledger_with(PRECISION / 100);
        let a = id("a");
        let b = id("b");
        ledger.mint(&minter(), &a, 10_000, PRECISION / 100, t(0)).unwrap();
        let moved = ledger
            .transfer(&Authority::account(a.clone()), &a, &b, Quantity::Max, t(10))
            .unwrap();
        assert_eq!(moved, 11_000);
        assert_eq!(ledger.principal_of(&b), 11_000);
        assert_eq!(ledger.accrual_rate(&b), PRECISION / 100);
        assert_eq!(ledger.accrual_rate(&a), 0);
        assert_eq!(ledger.total_principal(), 11_000);
    }

    #[test]
    fn transfer_requires_acting_for_sender() {
        let mut ledger = ledger_with(100);
        let a = id("a");
        let b = id("b");
        ledger.mint(&minter(), &a, 1_000, 100, t(0)).unwrap();
        let result = ledger.transfer(&Authority::account(b.clone()), &a, &b, Quantity::Max, t(0));
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(ledger.principal_of(&a), 1_000);
    }

    #[test]
    fn transfer_insufficient_balance_leaves_both_untouched() {
        let mut ledger = ledger_with(100);
        let a = id("a");
        let b = id("b");
        ledger.mint(&minter(), &a, 1_000, 100, t(0)).unwrap();
        let result = ledger.transfer(
            &Authority::account(a.clone()),
            &a,
            &b,
            Quantity::Exact(1_001),
            t(0),
        );
        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert!(ledger.account(&b).is_none());
        assert_eq!(ledger.principal_of(&a), 1_000);
    }

    #[test]
    fn self_transfer_only_materializes() {
        let mut ledger = ledger_with(PRECISION / 100);
        let a = id("a");
        ledger.mint(&minter(), &a, 10_000, PRECISION / 100, t(0)).unwrap();
        ledger
            .transfer(&Authority::account(a.clone()), &a, &a, Quantity::Exact(5_000), t(10))
            .unwrap();
        assert_eq!(ledger.principal_of(&a), 11_000);
        assert_eq!(ledger.last_sync_time(&a), t(10));
        assert_eq!(ledger.total_principal(), 11_000);
    }

    #[test]
    fn global_rate_ratchet() {
        let mut ledger = ledger_with(500);
        ledger.set_global_rate(&rate_setter(), 400, t(1)).unwrap();
        let result = ledger.set_global_rate(&rate_setter(), 450, t(2));
        assert!(matches!(result, Err(LedgerError::RateCanOnlyDecrease { .. })));
        assert_eq!(ledger.global_rate(), 400);
        assert_eq!(ledger.rate_history().len(), 2);
    }

    #[test]
    fn set_global_rate_requires_capability() {
        let mut ledger = ledger_with(500);
        let result = ledger.set_global_rate(&minter(), 100, t(1));
        assert!(matches!(
            result,
            Err(LedgerError::Unauthorized {
                capability: Capability::SetGlobalRate,
                ..
            })
        ));
        assert_eq!(ledger.global_rate(), 500);
    }

    #[test]
    fn zero_rate_credit_picks_up_next_positive_rate() {
        let mut ledger = ledger_with(0);
        let a = id("a");
        ledger.mint(&minter(), &a, 1_000, 0, t(0)).unwrap();
        assert_eq!(ledger.accrual_rate(&a), 0);
        assert_eq!(ledger.balance_of(&a, t(1_000)), 1_000);
        ledger.mint(&minter(), &a, 1, 77, t(10)).unwrap();
        assert_eq!(ledger.accrual_rate(&a), 77);
    }
}
