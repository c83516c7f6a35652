//! Nullable bridge transport: an in-memory queue between partitions.

use accrue_bridge::{BridgeError, BridgeTransport, Envelope};
use accrue_types::PartitionId;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    queue: VecDeque<Envelope>,
    sent: Vec<Envelope>,
    seen: HashSet<(PartitionId, u64)>,
}

/// A transport that queues envelopes until the test delivers them.
///
/// It enforces the exactly-once contract on the sending side: a second
/// envelope with the same source and sequence is refused. Tests can still
/// replay an envelope with [`redeliver`](Self::redeliver) to check how a
/// partition copes with a misbehaving transport.
#[derive(Default)]
pub struct NullTransport {
    state: Mutex<State>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest undelivered envelope.
    pub fn deliver_next(&self) -> Option<Envelope> {
        self.lock().queue.pop_front()
    }

    /// Envelopes accepted but not yet delivered.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Every envelope ever accepted, in send order.
    pub fn sent(&self) -> Vec<Envelope> {
        self.lock().sent.clone()
    }

    /// A copy of the `index`-th accepted envelope, bypassing deduplication.
    pub fn redeliver(&self, index: usize) -> Option<Envelope> {
        self.lock().sent.get(index).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BridgeTransport for NullTransport {
    fn send(&self, envelope: Envelope) -> Result<(), BridgeError> {
        let mut state = self.lock();
        let key = (envelope.source.clone(), envelope.sequence);
        if !state.seen.insert(key) {
            return Err(BridgeError::Transport(format!(
                "duplicate sequence {} from {}",
                envelope.sequence, envelope.source
            )));
        }
        state.sent.push(envelope.clone());
        state.queue.push_back(envelope);
        Ok(())
    }
}
