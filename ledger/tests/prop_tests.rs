use proptest::prelude::*;

use accrue_ledger::fixed::mul_div;
use accrue_ledger::{AccrualLedger, Authority, Capability, LedgerError};
use accrue_types::{AccountId, Quantity, Timestamp, PRECISION};

fn vault() -> Authority {
    Authority::service("vault", [Capability::Mint, Capability::Burn])
}

fn account(n: usize) -> AccountId {
    AccountId::new(format!("acct-{}", n)).unwrap()
}

proptest! {
    /// Transfers between accounts never change total principal, and the
    /// stored total always equals the sum of principals.
    #[test]
    fn transfers_conserve_principal(
        deposits in prop::collection::vec(1u128..1_000_000_000, 2..6),
        moves in prop::collection::vec((0usize..6, 0usize..6, 0u128..2_000_000_000), 1..30),
    ) {
        let mut ledger = AccrualLedger::new(PRECISION / 1_000_000, Timestamp::new(0));
        let now = Timestamp::new(0);
        for (i, amount) in deposits.iter().enumerate() {
            ledger.mint(&vault(), &account(i), *amount, ledger.global_rate(), now).unwrap();
        }
        let total = ledger.total_principal();

        for (from, to, amount) in moves {
            let from = account(from % deposits.len());
            let to = account(to % deposits.len());
            let auth = Authority::account(from.clone());
            match ledger.transfer(&auth, &from, &to, Quantity::Exact(amount), now) {
                Ok(_) | Err(LedgerError::InsufficientBalance { .. }) => {}
                Err(e) => prop_assert!(false, "unexpected error {}", e),
            }
            prop_assert_eq!(ledger.total_principal(), total);
            let sum: u128 = ledger.accounts().map(|(_, a)| a.principal).sum();
            prop_assert_eq!(sum, total);
        }
    }

    /// With no intervening operations, equal intervals add equal interest
    /// (within one unit of truncation) matching principal * rate * dt.
    #[test]
    fn accrual_is_linear(
        principal in 1u128..1_000_000_000_000_000_000_000_000,
        rate in 0u128..1_000_000_000_000,
        dt in 1u64..10_000_000,
    ) {
        let mut ledger = AccrualLedger::new(rate, Timestamp::new(0));
        let a = account(0);
        ledger.mint(&vault(), &a, principal, rate, Timestamp::new(0)).unwrap();

        let b0 = ledger.balance_of(&a, Timestamp::new(0));
        let b1 = ledger.balance_of(&a, Timestamp::new(dt));
        let b2 = ledger.balance_of(&a, Timestamp::new(2 * dt));
        let expected = mul_div(principal, rate * dt as u128, PRECISION).unwrap();

        prop_assert_eq!(b0, principal);
        prop_assert!((b1 - b0).abs_diff(expected) <= 1);
        prop_assert!((b2 - b1).abs_diff(b1 - b0) <= 1);
    }

    /// Once lowered, the global rate can never be raised again.
    #[test]
    fn global_rate_never_increases(
        initial in 0u128..1_000_000,
        requests in prop::collection::vec(0u128..2_000_000, 1..20),
    ) {
        let setter = Authority::service("rate-setter", [Capability::SetGlobalRate]);
        let mut ledger = AccrualLedger::new(initial, Timestamp::new(0));
        for (i, requested) in requests.into_iter().enumerate() {
            let before = ledger.global_rate();
            let result = ledger.set_global_rate(&setter, requested, Timestamp::new(i as u64));
            if requested > before {
                let is_ratchet_error = matches!(result, Err(LedgerError::RateCanOnlyDecrease { .. }));
                prop_assert!(is_ratchet_error);
                prop_assert_eq!(ledger.global_rate(), before);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(ledger.global_rate(), requested);
            }
        }
    }

    /// A failed burn leaves balance, principal and clock untouched.
    #[test]
    fn failed_burn_is_side_effect_free(
        principal in 1u128..1_000_000_000,
        excess in 1u128..1_000_000,
        later in 0u64..100_000,
    ) {
        let rate = PRECISION / 1_000_000;
        let mut ledger = AccrualLedger::new(rate, Timestamp::new(0));
        let a = account(0);
        ledger.mint(&vault(), &a, principal, rate, Timestamp::new(0)).unwrap();
        let now = Timestamp::new(later);
        let balance = ledger.balance_of(&a, now);

        let result = ledger.burn(&vault(), &a, Quantity::Exact(balance + excess), now);
        let is_insufficient = matches!(result, Err(LedgerError::InsufficientBalance { .. }));
        prop_assert!(is_insufficient);
        prop_assert_eq!(ledger.balance_of(&a, now), balance);
        prop_assert_eq!(ledger.principal_of(&a), principal);
        prop_assert_eq!(ledger.last_sync_time(&a), Timestamp::new(0));
    }

    /// mul_div agrees with plain arithmetic when the product fits.
    #[test]
    fn mul_div_matches_narrow_arithmetic(
        a in 0u128..u64::MAX as u128,
        b in 0u128..u64::MAX as u128,
        d in 1u128..u64::MAX as u128,
    ) {
        prop_assert_eq!(mul_div(a, b, d), Some(a * b / d));
    }

    /// Multiplying by PRECISION and dividing it back out is lossless.
    #[test]
    fn mul_div_precision_identity(a in 0u128..u128::MAX) {
        prop_assert_eq!(mul_div(a, PRECISION, PRECISION), Some(a));
    }
}
