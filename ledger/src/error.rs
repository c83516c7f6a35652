//! Ledger errors.

use crate::auth::Capability;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("global rate can only decrease: current {current}, requested {requested}")]
    RateCanOnlyDecrease { current: u128, requested: u128 },

    #[error("{caller} lacks the {capability} capability")]
    Unauthorized { caller: String, capability: Capability },

    #[error("arithmetic overflow in accrual computation")]
    Overflow,

    #[error("rate change timestamp must not precede the last change")]
    InvalidTimestamp,

    #[error("snapshot rejected: {0}")]
    CorruptSnapshot(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(#[from] accrue_store::StoreError),
}
