//! The transfer payload and its wire encoding.

use crate::error::BridgeError;
use accrue_types::AccountId;
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Current wire format version.
pub const PAYLOAD_VERSION: u8 = 1;

/// Upper bound on an encoded payload; anything larger is rejected unread.
pub const MAX_PAYLOAD_BYTES: u64 = 128;

/// The cross-partition message for one bridge transfer.
///
/// Carries no partition identifier: routing lives in the transport envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPayload {
    /// Principal burned on the source partition.
    pub amount: u128,
    /// The sender's rate at send time, carried verbatim.
    pub accrual_rate: u128,
    /// Recipient on the destination partition.
    pub destination: AccountId,
}

#[derive(Serialize)]
struct WireOut<'a> {
    version: u8,
    payload: &'a TransferPayload,
}

#[derive(Deserialize)]
struct WireIn {
    version: u8,
    payload: TransferPayload,
}

fn wire() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(MAX_PAYLOAD_BYTES)
        .reject_trailing_bytes()
}

impl TransferPayload {
    /// Check the fields a well-formed payload must satisfy.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.amount == 0 {
            return Err(BridgeError::PayloadRejected("zero amount".into()));
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, BridgeError> {
        wire()
            .serialize(&WireOut {
                version: PAYLOAD_VERSION,
                payload: self,
            })
            .map_err(|e| BridgeError::PayloadRejected(format!("encode: {}", e)))
    }

    /// Decode and validate. Every failure is a `PayloadRejected`.
    pub fn decode(bytes: &[u8]) -> Result<Self, BridgeError> {
        let wire_in: WireIn = wire()
            .deserialize(bytes)
            .map_err(|e| BridgeError::PayloadRejected(format!("decode: {}", e)))?;
        if wire_in.version != PAYLOAD_VERSION {
            return Err(BridgeError::PayloadRejected(format!(
                "unsupported version {}",
                wire_in.version
            )));
        }
        wire_in.payload.validate()?;
        Ok(wire_in.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferPayload {
        TransferPayload {
            amount: 1_000_000,
            accrual_rate: 50_000_000,
            destination: AccountId::new("bob").unwrap(),
        }
    }

    #[test]
    fn encode_then_decode_returns_same_payload() {
        let bytes = sample().encode().unwrap();
        assert_eq!(bytes[0], PAYLOAD_VERSION);
        assert_eq!(TransferPayload::decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = sample().encode().unwrap();
        bytes[0] = 9;
        assert!(matches!(
            TransferPayload::decode(&bytes),
            Err(BridgeError::PayloadRejected(_))
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = sample().encode().unwrap();
        bytes.push(0);
        assert!(TransferPayload::decode(&bytes).is_err());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let bytes = sample().encode().unwrap();
        assert!(TransferPayload::decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(TransferPayload::decode(&[]).is_err());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut payload = sample();
        payload.amount = 0;
        let bytes = payload.encode().unwrap();
        assert!(matches!(
            TransferPayload::decode(&bytes),
            Err(BridgeError::PayloadRejected(_))
        ));
    }

    #[test]
    fn malformed_destination_is_rejected() {
        let bytes = sample().encode().unwrap();
        // The destination string is the tail: 8-byte length prefix then "bob".
        let mut forged = bytes.clone();
        let last = forged.len() - 1;
        forged[last] = b' ';
        assert!(matches!(
            TransferPayload::decode(&forged),
            Err(BridgeError::PayloadRejected(_))
        ));
    }
}
