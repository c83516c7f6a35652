//! Per-partition bridge endpoint.

use crate::error::BridgeError;
use crate::payload::TransferPayload;
use accrue_ledger::{AccrualLedger, Authority, Capability, Credit};
use accrue_types::{AccountId, Quantity, Timestamp};

/// Turns outbound transfers into burns plus payloads, and inbound payloads
/// into mints at the carried rate.
///
/// The endpoint holds its own authority (`Mint` and `Burn`) for the ledger
/// calls it makes; the user initiating an outbound transfer must separately
/// act for the sending account.
#[derive(Clone, Debug)]
pub struct BridgeEndpoint {
    authority: Authority,
}

impl BridgeEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            authority: Authority::service(name, [Capability::Mint, Capability::Burn]),
        }
    }

    pub fn with_authority(authority: Authority) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Burn `quantity` from `sender` and build the payload for `destination`.
    ///
    /// Fails before any payload exists if the caller may not spend from
    /// `sender`, if there is nothing to send, or if the balance is short.
    pub fn outbound(
        &self,
        ledger: &mut AccrualLedger,
        caller: &Authority,
        sender: &AccountId,
        quantity: Quantity,
        destination: AccountId,
        now: Timestamp,
    ) -> Result<TransferPayload, BridgeError> {
        caller.acts_for(sender)?;
        let empty = match quantity {
            Quantity::Exact(amount) => amount == 0,
            Quantity::Max => ledger.balance_of_checked(sender, now)? == 0,
        };
        if empty {
            return Err(BridgeError::EmptyTransfer);
        }

        let debit = ledger.burn(&self.authority, sender, quantity, now)?;
        let payload = TransferPayload {
            amount: debit.amount,
            accrual_rate: debit.accrual_rate,
            destination,
        };
        tracing::info!(
            sender = %sender,
            destination = %payload.destination,
            amount = payload.amount,
            rate = payload.accrual_rate,
            "bridge transfer initiated"
        );
        Ok(payload)
    }

    /// Mint a delivered payload on this partition.
    ///
    /// Must run at most once per payload. A rejected payload leaves the
    /// ledger untouched.
    pub fn inbound(
        &self,
        ledger: &mut AccrualLedger,
        payload: &TransferPayload,
        now: Timestamp,
    ) -> Result<Credit, BridgeError> {
        payload.validate()?;
        let credit = ledger.mint(
            &self.authority,
            &payload.destination,
            payload.amount,
            payload.accrual_rate,
            now,
        )?;
        tracing::info!(
            destination = %payload.destination,
            amount = payload.amount,
            carried_rate = payload.accrual_rate,
            rate = credit.accrual_rate,
            "bridge transfer delivered"
        );
        Ok(credit)
    }

    /// Decode an encoded payload and mint it.
    pub fn inbound_bytes(
        &self,
        ledger: &mut AccrualLedger,
        bytes: &[u8],
        now: Timestamp,
    ) -> Result<(TransferPayload, Credit), BridgeError> {
        let payload = TransferPayload::decode(bytes)?;
        let credit = self.inbound(ledger, &payload, now)?;
        Ok((payload, credit))
    }
}
