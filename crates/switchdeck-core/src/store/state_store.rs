// ── Entity state storage ──
//
// Concurrent storage with push-based change notification via a `watch`
// channel. Every mutation republishes the snapshot subscribers receive.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::trace;

use crate::model::{EntityId, EntityState, StateSnapshot};
use crate::stream::SnapshotStream;

/// Latest state of every entity the host reports.
pub struct StateStore {
    entries: DashMap<EntityId, Arc<EntityState>>,
    snapshot: watch::Sender<StateSnapshot>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(StateSnapshot::default());
        Self {
            entries: DashMap::new(),
            snapshot,
        }
    }

    /// Replace everything with a full state dump.
    ///
    /// Upserts first, then prunes ids missing from the dump, so readers
    /// never observe a transient empty store.
    pub fn replace_all(&self, states: impl IntoIterator<Item = (EntityId, EntityState)>) {
        let mut incoming = HashSet::new();
        for (id, state) in states {
            incoming.insert(id.clone());
            self.entries.insert(id, Arc::new(state));
        }
        self.entries.retain(|id, _| incoming.contains(id));

        self.publish();
    }

    /// Apply one `state_changed` event. `None` removes the entity.
    pub fn apply_change(&self, entity_id: EntityId, new_state: Option<EntityState>) {
        match new_state {
            Some(state) => {
                trace!(entity_id = %entity_id, state = %state.state, "state changed");
                self.entries.insert(entity_id, Arc::new(state));
            }
            None => {
                trace!(entity_id = %entity_id, "entity removed");
                if self.entries.remove(&entity_id).is_none() {
                    return;
                }
            }
        }
        self.publish();
    }

    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityState>> {
        self.entries.get(entity_id).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish(&self) {
        let entries: HashMap<EntityId, Arc<EntityState>> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot
            .send_modify(|snap| *snap = StateSnapshot::new(entries));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(id: &str, state: &str) -> (EntityId, EntityState) {
        (EntityId::from(id), EntityState::new(state))
    }

    #[test]
    fn replace_all_prunes_missing_entities() {
        let store = StateStore::new();
        store.replace_all([entry("switch.a", "on"), entry("switch.b", "off")]);
        assert_eq!(store.len(), 2);

        store.replace_all([entry("switch.b", "on")]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("switch.b").unwrap().state, "on");
        assert!(!snap.contains("switch.a"));
    }

    #[test]
    fn apply_change_updates_and_removes() {
        let store = StateStore::new();
        store.replace_all([entry("switch.a", "on")]);

        store.apply_change(EntityId::from("switch.a"), Some(EntityState::new("off")));
        assert_eq!(store.get("switch.a").unwrap().state, "off");

        store.apply_change(EntityId::from("switch.a"), None);
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn removing_unknown_entity_does_not_publish() {
        let store = StateStore::new();
        store.replace_all([entry("switch.a", "on")]);
        let mut stream = store.subscribe();

        store.apply_change(EntityId::from("switch.ghost"), None);
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), stream.changed()).await;
        assert!(waited.is_err());
        assert_eq!(stream.latest().len(), 1);
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = StateStore::new();
        store.replace_all([entry("switch.a", "on")]);
        let held = store.snapshot();
        store.apply_change(EntityId::from("switch.a"), Some(EntityState::new("off")));
        assert_eq!(held.get("switch.a").unwrap().state, "on");
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = StateStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.apply_change(EntityId::from("switch.a"), Some(EntityState::new("on")));
        let next = stream.changed().await.unwrap();
        assert!(next.contains("switch.a"));
    }
}
