//! Ledger snapshots: the full state of one partition at a point in time.
//!
//! A snapshot lists every account in id order together with the rate
//! history and the recorded total principal. Its Blake2b digest covers all
//! of that, so a snapshot shipped between operators can be checked for
//! tampering, and [`LedgerSnapshot::verify`] doubles as the conservation
//! audit: the recorded total must equal the sum of the listed principals.

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::LedgerError;
use crate::ledger::AccrualLedger;
use crate::rate::{RateChange, RateRegistry};
use accrue_types::{AccountId, Timestamp};

pub const SNAPSHOT_VERSION: u32 = 1;

/// A ledger snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Blake2b-256 over everything below except `taken_at`.
    pub hash: [u8; 32],
    pub taken_at: Timestamp,
    pub rate_history: Vec<RateChange>,
    pub total_principal: u128,
    /// Sorted by account id.
    pub accounts: Vec<AccountSnapshot>,
    pub version: u32,
}

/// The state of a single account captured in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub principal: u128,
    pub accrual_rate: u128,
    pub last_sync_time: Timestamp,
}

impl LedgerSnapshot {
    fn compute_hash(&self) -> [u8; 32] {
        use blake2::digest::consts::U32;
        use blake2::{Blake2b, Digest};

        let mut hasher = Blake2b::<U32>::new();
        hasher.update(self.version.to_le_bytes());
        for change in &self.rate_history {
            hasher.update(change.rate.to_le_bytes());
            hasher.update(change.effective_at.as_secs().to_le_bytes());
        }
        hasher.update(self.total_principal.to_le_bytes());
        for account in &self.accounts {
            hasher.update((account.id.as_str().len() as u32).to_le_bytes());
            hasher.update(account.id.as_bytes());
            hasher.update(account.principal.to_le_bytes());
            hasher.update(account.accrual_rate.to_le_bytes());
            hasher.update(account.last_sync_time.as_secs().to_le_bytes());
        }

        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Hex form of the digest, for logs.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Check the digest and that the recorded total matches the accounts.
    pub fn verify(&self) -> Result<(), LedgerError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(LedgerError::CorruptSnapshot(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.hash != self.compute_hash() {
            return Err(LedgerError::CorruptSnapshot("digest mismatch".into()));
        }
        let mut sum: u128 = 0;
        for account in &self.accounts {
            sum = sum
                .checked_add(account.principal)
                .ok_or(LedgerError::Overflow)?;
        }
        if sum != self.total_principal {
            return Err(LedgerError::CorruptSnapshot(format!(
                "total principal {} does not match account sum {}",
                self.total_principal, sum
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl AccrualLedger {
    /// Capture the current state. Interest is not materialized.
    pub fn snapshot(&self, taken_at: Timestamp) -> LedgerSnapshot {
        let mut accounts: Vec<AccountSnapshot> = self
            .accounts()
            .map(|(id, acct)| AccountSnapshot {
                id: id.clone(),
                principal: acct.principal,
                accrual_rate: acct.accrual_rate,
                last_sync_time: acct.last_sync_time,
            })
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));

        let mut snap = LedgerSnapshot {
            hash: [0u8; 32],
            taken_at,
            rate_history: self.rate_history().to_vec(),
            total_principal: self.total_principal(),
            accounts,
            version: SNAPSHOT_VERSION,
        };
        snap.hash = snap.compute_hash();
        snap
    }

    /// Rebuild a ledger from a snapshot that passes [`LedgerSnapshot::verify`].
    pub fn from_snapshot(snap: &LedgerSnapshot) -> Result<Self, LedgerError> {
        snap.verify()?;
        let rates = RateRegistry::from_changes(snap.rate_history.clone())?;
        let accounts = snap
            .accounts
            .iter()
            .map(|a| {
                (
                    a.id.clone(),
                    Account {
                        principal: a.principal,
                        accrual_rate: a.accrual_rate,
                        last_sync_time: a.last_sync_time,
                    },
                )
            })
            .collect();
        Self::from_parts(accounts, rates)
    }
}
