//! Global rate registry: the one-way ratchet on the rate offered to new accounts.

use crate::error::LedgerError;
use accrue_types::Timestamp;
use serde::{Deserialize, Serialize};

/// One accepted value of the global rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateChange {
    /// Rate offered to newly credited accounts, scaled by `PRECISION`.
    pub rate: u128,
    /// When this rate took effect.
    pub effective_at: Timestamp,
}

/// The partition-wide global rate and its append-only history.
///
/// Rates are non-increasing along the history and timestamps are
/// non-decreasing. The last entry is the current rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRegistry {
    changes: Vec<RateChange>,
}

impl RateRegistry {
    pub fn new(initial_rate: u128, genesis: Timestamp) -> Self {
        Self {
            changes: vec![RateChange {
                rate: initial_rate,
                effective_at: genesis,
            }],
        }
    }

    /// Rebuild a registry from a persisted history, re-checking its invariants.
    pub fn from_changes(changes: Vec<RateChange>) -> Result<Self, LedgerError> {
        if changes.is_empty() {
            return Err(LedgerError::CorruptSnapshot("empty rate history".into()));
        }
        for pair in changes.windows(2) {
            if pair[1].rate > pair[0].rate {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "rate history increases from {} to {}",
                    pair[0].rate, pair[1].rate
                )));
            }
            if pair[1].effective_at < pair[0].effective_at {
                return Err(LedgerError::CorruptSnapshot(
                    "rate history is not time-ordered".into(),
                ));
            }
        }
        Ok(Self { changes })
    }

    /// The rate currently offered to new accounts.
    pub fn current_rate(&self) -> u128 {
        self.changes.last().map(|c| c.rate).unwrap_or(0)
    }

    /// Lower the rate to `new_rate` effective at `at`.
    ///
    /// Raising the rate always fails with `RateCanOnlyDecrease`. Setting the
    /// current value again is accepted and leaves the history untouched.
    pub fn lower(&mut self, new_rate: u128, at: Timestamp) -> Result<(), LedgerError> {
        let current = self.current_rate();
        if new_rate > current {
            return Err(LedgerError::RateCanOnlyDecrease {
                current,
                requested: new_rate,
            });
        }
        if let Some(last) = self.changes.last() {
            if at < last.effective_at {
                return Err(LedgerError::InvalidTimestamp);
            }
        }
        if new_rate == current {
            return Ok(());
        }
        self.changes.push(RateChange {
            rate: new_rate,
            effective_at: at,
        });
        Ok(())
    }

    pub fn history(&self) -> &[RateChange] {
        &self.changes
    }
}

impl Default for RateRegistry {
    fn default() -> Self {
        Self::new(0, Timestamp::EPOCH)
    }
}
