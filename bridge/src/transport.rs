//! Interface to the transport collaborator.
//!
//! The transport moves encoded payloads between partitions. It is expected
//! to authenticate senders, preserve integrity, and hand each envelope to
//! the destination exactly once; none of that is implemented here.

use crate::error::BridgeError;
use accrue_types::PartitionId;
use serde::{Deserialize, Serialize};

/// Routing wrapper around an encoded [`TransferPayload`](crate::TransferPayload).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub source: PartitionId,
    pub destination: PartitionId,
    /// Per-source sequence number; the transport's handle for deduplication.
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// Outbound side of the transport.
pub trait BridgeTransport: Send + Sync {
    /// Accept an envelope for eventual delivery. Returning `Ok` promises
    /// nothing about when, or whether, it arrives.
    fn send(&self, envelope: Envelope) -> Result<(), BridgeError>;
}
