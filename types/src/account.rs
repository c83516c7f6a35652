//! Account identifier type.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one account within a partition.
///
/// Identifiers are opaque to the ledger. They must be non-empty, at most
/// [`AccountId::MAX_LEN`] bytes, and use only ASCII alphanumerics plus `_`, `-`
/// and `.` so they survive any transport and storage key encoding unchanged.
/// Deserialization applies the same validation, which is how a malformed
/// destination inside a bridge payload is caught.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub const MAX_LEN: usize = 64;

    /// Create an account id, validating its shape.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(TypesError::InvalidAccountId(s, "empty"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(TypesError::InvalidAccountId(s, "too long"));
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        {
            return Err(TypesError::InvalidAccountId(s, "unsupported character"));
        }
        Ok(Self(s))
    }

    /// Return the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}
