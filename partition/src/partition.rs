//! One partition: a ledger behind a lock, driven by a clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use accrue_bridge::{BridgeEndpoint, BridgeTransport, Envelope};
use accrue_ledger::{AccrualLedger, Authority, Credit, Debit, LedgerSnapshot};
use accrue_store::LedgerStore;
use accrue_store_lmdb::LmdbEnvironment;
use accrue_types::{AccountId, Clock, PartitionId, Quantity, Timestamp};
use accrue_utils::StatsCounter;

use crate::config::PartitionConfig;
use crate::PartitionError;

/// Names of the counters a partition keeps.
pub mod counters {
    pub const MINTS: &str = "mints";
    pub const BURNS: &str = "burns";
    pub const TRANSFERS: &str = "transfers";
    pub const BRIDGE_SENT: &str = "bridge_sent";
    pub const BRIDGE_RECEIVED: &str = "bridge_received";
    pub const BRIDGE_REJECTED: &str = "bridge_rejected";
    pub const RATE_CHANGES: &str = "rate_changes";

    pub const ALL: &[&str] = &[
        MINTS,
        BURNS,
        TRANSFERS,
        BRIDGE_SENT,
        BRIDGE_RECEIVED,
        BRIDGE_REJECTED,
        RATE_CHANGES,
    ];
}

const BRIDGE_SEQUENCE_KEY: &[u8] = b"bridge_sequence";

pub type SharedStore = Box<dyn LedgerStore + Send + Sync>;

/// A running partition.
///
/// Each ledger call takes the partition lock for its whole duration, reads
/// the clock once, and releases the lock before returning. Nothing blocks on
/// I/O under the lock; [`checkpoint`](Self::checkpoint) copies the ledger
/// and writes the copy after unlocking. Checkpoints are serialized among
/// themselves so an older copy never lands on top of a newer one.
pub struct Partition {
    id: PartitionId,
    ledger: Mutex<AccrualLedger>,
    clock: Arc<dyn Clock>,
    store: Option<SharedStore>,
    endpoint: BridgeEndpoint,
    pub(crate) stats: StatsCounter,
    /// Only advanced under the ledger lock, so a ledger copy and the
    /// sequence read with it always agree.
    next_sequence: AtomicU64,
    checkpoint_lock: Mutex<()>,
}

impl Partition {
    /// An in-memory partition with a fresh ledger.
    pub fn new(id: PartitionId, initial_rate: u128, clock: Arc<dyn Clock>) -> Self {
        let ledger = AccrualLedger::new(initial_rate, clock.now());
        Self::assemble(id, ledger, clock, None, 0)
    }

    /// A partition backed by `store`, resuming from whatever it holds.
    pub fn open(
        id: PartitionId,
        initial_rate: u128,
        clock: Arc<dyn Clock>,
        store: SharedStore,
    ) -> Result<Self, PartitionError> {
        let ledger = match AccrualLedger::load_from_store(store.as_ref())? {
            Some(ledger) => {
                tracing::info!(
                    partition = %id,
                    accounts = ledger.account_count(),
                    total_principal = ledger.total_principal(),
                    "resumed ledger from store"
                );
                ledger
            }
            None => AccrualLedger::new(initial_rate, clock.now()),
        };
        let next_sequence = match store.get_meta(BRIDGE_SEQUENCE_KEY)? {
            Some(bytes) => decode_sequence(&bytes)?,
            None => 0,
        };
        Ok(Self::assemble(id, ledger, clock, Some(store), next_sequence))
    }

    /// Build a partition from configuration, opening LMDB if a data
    /// directory is set.
    pub fn from_config(
        config: &PartitionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PartitionError> {
        let initial_rate = u128::from(config.initial_global_rate);
        match &config.data_dir {
            Some(dir) => {
                let env = LmdbEnvironment::open(dir, config.map_size)
                    .map_err(accrue_store::StoreError::from)?;
                Self::open(
                    config.partition.clone(),
                    initial_rate,
                    clock,
                    Box::new(env.ledger_store()),
                )
            }
            None => Ok(Self::new(config.partition.clone(), initial_rate, clock)),
        }
    }

    fn assemble(
        id: PartitionId,
        ledger: AccrualLedger,
        clock: Arc<dyn Clock>,
        store: Option<SharedStore>,
        next_sequence: u64,
    ) -> Self {
        let endpoint = BridgeEndpoint::new(format!("bridge:{}", id));
        Self {
            id,
            ledger: Mutex::new(ledger),
            clock,
            store,
            endpoint,
            stats: StatsCounter::new(counters::ALL),
            next_sequence: AtomicU64::new(next_sequence),
            checkpoint_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &PartitionId {
        &self.id
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn stats(&self) -> Vec<(&'static str, u64)> {
        self.stats.snapshot()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.stats.get(name)
    }

    /// Run `f` against the ledger under the partition lock.
    pub fn with_ledger<T>(
        &self,
        f: impl FnOnce(&mut AccrualLedger, Timestamp) -> Result<T, PartitionError>,
    ) -> Result<T, PartitionError> {
        let mut ledger = self.lock()?;
        let now = self.clock.now();
        f(&mut ledger, now)
    }

    fn lock(&self) -> Result<MutexGuard<'_, AccrualLedger>, PartitionError> {
        self.ledger.lock().map_err(|_| PartitionError::Poisoned)
    }

    fn reject<T>(&self, op: &'static str, err: PartitionError) -> Result<T, PartitionError> {
        tracing::warn!(partition = %self.id, op, error = %err, "operation rejected");
        Err(err)
    }

    // ── Ledger operations ──────────────────────────────────────────────

    pub fn mint(
        &self,
        auth: &Authority,
        account: &AccountId,
        amount: u128,
        rate_for_new_credit: u128,
    ) -> Result<Credit, PartitionError> {
        match self.with_ledger(|l, now| Ok(l.mint(auth, account, amount, rate_for_new_credit, now)?)) {
            Ok(credit) => {
                self.stats.increment(counters::MINTS);
                Ok(credit)
            }
            Err(e) => self.reject("mint", e),
        }
    }

    pub fn burn(
        &self,
        auth: &Authority,
        account: &AccountId,
        quantity: Quantity,
    ) -> Result<Debit, PartitionError> {
        match self.with_ledger(|l, now| Ok(l.burn(auth, account, quantity, now)?)) {
            Ok(debit) => {
                self.stats.increment(counters::BURNS);
                Ok(debit)
            }
            Err(e) => self.reject("burn", e),
        }
    }

    pub fn transfer(
        &self,
        auth: &Authority,
        from: &AccountId,
        to: &AccountId,
        quantity: Quantity,
    ) -> Result<u128, PartitionError> {
        match self.with_ledger(|l, now| Ok(l.transfer(auth, from, to, quantity, now)?)) {
            Ok(amount) => {
                self.stats.increment(counters::TRANSFERS);
                Ok(amount)
            }
            Err(e) => self.reject("transfer", e),
        }
    }

    pub fn set_global_rate(&self, auth: &Authority, new_rate: u128) -> Result<(), PartitionError> {
        match self.with_ledger(|l, now| Ok(l.set_global_rate(auth, new_rate, now)?)) {
            Ok(()) => {
                self.stats.increment(counters::RATE_CHANGES);
                Ok(())
            }
            Err(e) => self.reject("set_global_rate", e),
        }
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<u128, PartitionError> {
        self.with_ledger(|l, now| Ok(l.balance_of_checked(account, now)?))
    }

    /// Stored principal, without pending interest.
    pub fn principal_of(&self, account: &AccountId) -> Result<u128, PartitionError> {
        Ok(self.lock()?.principal_of(account))
    }

    pub fn accrual_rate(&self, account: &AccountId) -> Result<u128, PartitionError> {
        Ok(self.lock()?.accrual_rate(account))
    }

    pub fn last_sync_time(&self, account: &AccountId) -> Result<Timestamp, PartitionError> {
        Ok(self.lock()?.last_sync_time(account))
    }

    pub fn global_rate(&self) -> Result<u128, PartitionError> {
        Ok(self.lock()?.global_rate())
    }

    pub fn total_principal(&self) -> Result<u128, PartitionError> {
        Ok(self.lock()?.total_principal())
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, PartitionError> {
        self.with_ledger(|l, now| Ok(l.snapshot(now)))
    }

    // ── Bridge ─────────────────────────────────────────────────────────

    /// Burn from `sender` here and hand the payload for `recipient` on
    /// `destination` to the transport.
    ///
    /// Once the burn commits there is no undo. If the transport refuses the
    /// envelope the error carries it so the caller can try again.
    pub fn bridge_send(
        &self,
        caller: &Authority,
        sender: &AccountId,
        quantity: Quantity,
        destination: PartitionId,
        recipient: AccountId,
        transport: &dyn BridgeTransport,
    ) -> Result<Envelope, PartitionError> {
        let outbound = self.with_ledger(|l, now| {
            let payload =
                self.endpoint
                    .outbound(l, caller, sender, quantity, recipient, now)?;
            let bytes = payload.encode()?;
            let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            Ok((payload, bytes, sequence))
        });
        let (payload, bytes, sequence) = match outbound {
            Ok(sent) => sent,
            Err(e) => return self.reject("bridge_send", e),
        };
        self.stats.increment(counters::BRIDGE_SENT);

        let envelope = Envelope {
            source: self.id.clone(),
            destination,
            sequence,
            payload: bytes,
        };
        tracing::info!(
            partition = %self.id,
            destination = %envelope.destination,
            sequence = envelope.sequence,
            amount = payload.amount,
            "bridge envelope sent"
        );
        match transport.send(envelope.clone()) {
            Ok(()) => Ok(envelope),
            Err(e) => {
                tracing::error!(
                    partition = %self.id,
                    sequence = envelope.sequence,
                    error = %e,
                    "transport refused envelope after burn"
                );
                Err(PartitionError::Undelivered {
                    envelope: Box::new(envelope),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Mint the payload of an envelope addressed to this partition.
    ///
    /// Call once per envelope; the ledger does not recognize replays.
    pub fn bridge_receive(&self, envelope: &Envelope) -> Result<Credit, PartitionError> {
        let result = if envelope.destination != self.id {
            Err(PartitionError::Misrouted {
                partition: self.id.clone(),
                destination: envelope.destination.clone(),
            })
        } else {
            self.with_ledger(|l, now| {
                let (_, credit) = self.endpoint.inbound_bytes(l, &envelope.payload, now)?;
                Ok(credit)
            })
        };
        match result {
            Ok(credit) => {
                self.stats.increment(counters::BRIDGE_RECEIVED);
                tracing::info!(
                    partition = %self.id,
                    source = %envelope.source,
                    sequence = envelope.sequence,
                    amount = credit.amount,
                    "bridge envelope received"
                );
                Ok(credit)
            }
            Err(e) => {
                self.stats.increment(counters::BRIDGE_REJECTED);
                self.reject("bridge_receive", e)
            }
        }
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Persist the ledger and bridge sequence in one batch. Returns `false`
    /// when the partition has no store.
    pub fn checkpoint(&self) -> Result<bool, PartitionError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let _serial = self
            .checkpoint_lock
            .lock()
            .map_err(|_| PartitionError::Poisoned)?;
        let (ledger, sequence) = {
            let guard = self.lock()?;
            (guard.clone(), self.next_sequence.load(Ordering::SeqCst))
        };

        let mut batch = ledger.store_batch()?;
        batch.put_meta(BRIDGE_SEQUENCE_KEY, sequence.to_be_bytes().to_vec());
        store.apply_batch(batch)?;
        tracing::debug!(
            partition = %self.id,
            accounts = ledger.account_count(),
            sequence,
            "checkpoint written"
        );
        Ok(true)
    }
}

fn decode_sequence(bytes: &[u8]) -> Result<u64, PartitionError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        accrue_store::StoreError::Corruption(format!("bridge sequence of {} bytes", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}
