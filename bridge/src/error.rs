//! Bridge errors.

use accrue_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("payload rejected: {0}")]
    PayloadRejected(String),

    #[error("nothing to transfer")]
    EmptyTransfer,

    #[error("transport error: {0}")]
    Transport(String),
}
