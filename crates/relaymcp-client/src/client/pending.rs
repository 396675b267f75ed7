//! Pending-request table.
//!
//! Maps locally generated correlation ids to the one-shot channels their
//! awaiters wait on. Removal happens under the map lock before a sender
//! is consumed, so each entry resolves exactly once no matter how the
//! response, timeout, cancellation, and shutdown paths race.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

type Waiter = oneshot::Sender<ClientResult<Value>>;

/// Pending-request map plus the 64-bit id allocator.
#[derive(Debug)]
pub(crate) struct PendingRequests {
    /// Monotonically increasing; 64 bits so a session never wraps.
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, Waiter>>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next correlation id.
    pub(crate) fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Park an awaiter for `id`.
    pub(crate) fn park(&self, id: u64) -> oneshot::Receiver<ClientResult<Value>> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .expect("pending map poisoned")
            .insert(id, tx);
        rx
    }

    /// Remove the entry for `id` without resolving it. Used by the
    /// timeout path: a `Some` return means the caller owns the
    /// resolution; `None` means someone else already resolved it.
    pub(crate) fn remove(&self, id: u64) -> Option<Waiter> {
        self.waiters.lock().expect("pending map poisoned").remove(&id)
    }

    /// Resolve the entry for `id`. Returns `false` when no entry exists
    /// (late response, already timed out, or never ours) - the caller
    /// logs and drops.
    pub(crate) fn resolve(&self, id: u64, result: ClientResult<Value>) -> bool {
        let waiter = self.remove(id);
        match waiter {
            Some(tx) => {
                // A dropped receiver means the awaiter went away
                // (cancelled future); that is a valid resolution too.
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Resolve every pending entry with a clone of `error` and clear the
    /// map. Used when the transport dies or the client shuts down.
    pub(crate) fn fail_all(&self, error: ClientError) {
        let waiters: Vec<(u64, Waiter)> = {
            let mut map = self.waiters.lock().expect("pending map poisoned");
            map.drain().collect()
        };
        if !waiters.is_empty() {
            warn!(
                "failing {} pending request(s): {error}",
                waiters.len()
            );
        }
        for (_, tx) in waiters {
            let _ = tx.send(Err(error.clone()));
        }
    }

    /// Number of in-flight requests.
    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().expect("pending map poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_strictly_increasing() {
        let pending = PendingRequests::new();
        let a = pending.allocate_id();
        let b = pending.allocate_id();
        let c = pending.allocate_id();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn resolve_wakes_the_awaiter_once() {
        let pending = PendingRequests::new();
        let id = pending.allocate_id();
        let rx = pending.park(id);

        assert!(pending.resolve(id, Ok(json!({"ok": true}))));
        assert_eq!(rx.await.unwrap().unwrap(), json!({"ok": true}));

        // Second resolution attempt finds no entry.
        assert!(!pending.resolve(id, Ok(json!({"ok": false}))));
    }

    #[tokio::test]
    async fn remove_then_resolve_is_a_noop() {
        let pending = PendingRequests::new();
        let id = pending.allocate_id();
        let rx = pending.park(id);

        // Timeout path takes the entry...
        let waiter = pending.remove(id).expect("entry present");
        drop(waiter);

        // ...so a late response resolves nothing.
        assert!(!pending.resolve(id, Ok(json!(1))));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn fail_all_clears_and_resolves_everything() {
        let pending = PendingRequests::new();
        let rx1 = pending.park(pending.allocate_id());
        let rx2 = pending.park(pending.allocate_id());
        assert_eq!(pending.len(), 2);

        pending.fail_all(ClientError::Transport("gone".into()));
        assert_eq!(pending.len(), 0);
        assert!(matches!(rx1.await.unwrap(), Err(ClientError::Transport(_))));
        assert!(matches!(rx2.await.unwrap(), Err(ClientError::Transport(_))));
    }
}
