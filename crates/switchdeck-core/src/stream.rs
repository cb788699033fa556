// ── Snapshot subscription ──
//
// Thin wrapper over a `watch::Receiver<StateSnapshot>` that remembers
// the snapshot seen at subscription time.

use tokio::sync::watch;

use crate::model::StateSnapshot;

/// Subscription handle vended by [`StateStore::subscribe`](crate::StateStore::subscribe).
pub struct SnapshotStream {
    current: StateSnapshot,
    receiver: watch::Receiver<StateSnapshot>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<StateSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot as of subscription time.
    pub fn current(&self) -> &StateSnapshot {
        &self.current
    }

    /// Latest snapshot, marking it seen.
    pub fn latest(&mut self) -> StateSnapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next publish. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<StateSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.latest())
    }
}
