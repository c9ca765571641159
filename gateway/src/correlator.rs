//! Pending-request registry keyed by correlation id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, oneshot};

use sideload_types::{InboundMessage, RequestId};

/// Owns the pending-request map exclusively.
///
/// The mutation surface is deliberately narrow (`register` and `resolve`,
/// plus `forget` for the gateway's failure paths) so no other component can
/// touch the map directly. A pending entry exists from `register` until the
/// matching `resolve` or `forget`, whichever comes first.
#[derive(Debug)]
pub(crate) struct Correlator {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<InboundMessage>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh id, strictly greater than every previously issued one.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a single-assignment slot for `id` and return its receiving half.
    pub async fn register(&self, id: RequestId) -> oneshot::Receiver<InboundMessage> {
        let (tx, rx) = oneshot::channel();
        let previous = self.pending.lock().await.insert(id, tx);
        debug_assert!(previous.is_none(), "correlation id {id} reused");
        rx
    }

    /// Complete the slot for `id` with `msg`.
    ///
    /// Late or duplicate replies find no slot and are discarded; that is
    /// normal channel noise, not an error. Returns whether a slot was
    /// completed; a given id completes at most once.
    pub async fn resolve(&self, id: RequestId, msg: InboundMessage) -> bool {
        let Some(tx) = self.pending.lock().await.remove(&id) else {
            tracing::debug!("no pending request {id}; discarding reply");
            return false;
        };
        if tx.send(msg).is_err() {
            // Caller gave up (timed out) between our remove and send.
            tracing::debug!("pending request {id} abandoned before reply arrived");
            return false;
        }
        true
    }

    /// Drop the slot for `id` without completing it.
    ///
    /// Used on every abandoned-request path so aborted exchanges do not leak
    /// map entries.
    pub async fn forget(&self, id: RequestId) {
        self.pending.lock().await.remove(&id);
    }

    #[cfg(test)]
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}
