//! Cross-partition bridge for the accrual ledger.
//!
//! A transfer is two independent steps on two independently locked
//! partitions:
//!
//! 1. `outbound` on the source burns the sender's balance and produces a
//!    [`TransferPayload`] carrying the amount, the sender's accrual rate and
//!    the destination account.
//! 2. Some time later, `inbound` on the destination mints the amount with
//!    the carried rate, so bridging never changes a user's rate.
//!
//! Delivery, authentication and duplicate suppression belong to the
//! transport. The ledger has no notion of payload identity: delivering the
//! same payload twice mints twice.

pub mod endpoint;
pub mod error;
pub mod payload;
pub mod transport;

pub use endpoint::BridgeEndpoint;
pub use error::BridgeError;
pub use payload::{TransferPayload, MAX_PAYLOAD_BYTES, PAYLOAD_VERSION};
pub use transport::{BridgeTransport, Envelope};
