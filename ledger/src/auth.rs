//! Capability context passed into every gated ledger call.
//!
//! Who may hold which capability is decided outside the ledger; the ledger
//! only checks that the authority presented with a call carries it.

use crate::error::LedgerError;
use accrue_types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A privileged action on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Credit new value into an account.
    Mint,
    /// Destroy value held by any account.
    Burn,
    /// Move value out of accounts the caller does not own.
    Transfer,
    /// Lower the partition's global rate.
    SetGlobalRate,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::Transfer => "transfer",
            Self::SetGlobalRate => "set-global-rate",
        };
        write!(f, "{}", name)
    }
}

/// Who is making a call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    /// An account holder acting on their own account.
    Account(AccountId),
    /// A named collaborator: a vault, a bridge endpoint, the rate setter.
    Service(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account {}", id),
            Self::Service(name) => write!(f, "service {}", name),
        }
    }
}

/// A caller together with the capabilities it has been granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    caller: Principal,
    capabilities: BTreeSet<Capability>,
}

impl Authority {
    /// An account holder with no privileges beyond spending their own balance.
    pub fn account(id: AccountId) -> Self {
        Self {
            caller: Principal::Account(id),
            capabilities: BTreeSet::new(),
        }
    }

    /// A named service holding the given capabilities.
    pub fn service(
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            caller: Principal::Service(name.into()),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn caller(&self) -> &Principal {
        &self.caller
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Fail with `Unauthorized` unless `capability` was granted.
    pub fn require(&self, capability: Capability) -> Result<(), LedgerError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(self.denied(capability))
        }
    }

    /// Fail with `Unauthorized` unless the caller owns `account` or holds
    /// the `Transfer` capability.
    pub fn acts_for(&self, account: &AccountId) -> Result<(), LedgerError> {
        match &self.caller {
            Principal::Account(own) if own == account => Ok(()),
            _ => self.require(Capability::Transfer),
        }
    }

    fn denied(&self, capability: Capability) -> LedgerError {
        LedgerError::Unauthorized {
            caller: self.caller.to_string(),
            capability,
        }
    }
}
