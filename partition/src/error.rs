use accrue_bridge::Envelope;
use accrue_types::PartitionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("ledger error: {0}")]
    Ledger(#[from] accrue_ledger::LedgerError),

    #[error("bridge error: {0}")]
    Bridge(#[from] accrue_bridge::BridgeError),

    #[error("store error: {0}")]
    Store(#[from] accrue_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("envelope for {destination} delivered to {partition}")]
    Misrouted {
        partition: PartitionId,
        destination: PartitionId,
    },

    /// The burn already happened; the caller holds the envelope and may
    /// hand it to the transport again.
    #[error("transport refused envelope {}: {reason}", envelope.sequence)]
    Undelivered {
        envelope: Box<Envelope>,
        reason: String,
    },

    #[error("reserve shortfall: need {needed}, have {available}")]
    ReserveShortfall { needed: u128, available: u128 },

    #[error("ledger lock poisoned")]
    Poisoned,
}
