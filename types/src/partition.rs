//! Partition identifier.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names one independent ledger instance.
///
/// Partition ids only appear in transport envelopes and configuration. A
/// transfer payload never carries one; routing is the transport's concern.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionId(String);

impl PartitionId {
    pub const MAX_LEN: usize = 32;

    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(TypesError::InvalidPartitionId(s, "empty"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(TypesError::InvalidPartitionId(s, "too long"));
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(TypesError::InvalidPartitionId(s, "unsupported character"));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PartitionId {
    fn default() -> Self {
        Self("local".to_string())
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PartitionId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PartitionId> for String {
    fn from(id: PartitionId) -> Self {
        id.0
    }
}
