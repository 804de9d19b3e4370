//! Pending-command overlay
//!
//! Optional responsiveness layer on top of [`EntityStore`]. Commands in
//! flight are recorded here under a client-generated request id and merged
//! into a read-only view; the store itself is never touched. Entries are
//! dropped when the confirming notification arrives (`confirm`) or when the
//! command fails (`fail`).

use std::collections::HashMap;

use uuid::Uuid;

use super::{Entity, EntityStore};

/// Client-generated id for one in-flight command.
pub type RequestId = Uuid;

#[derive(Debug, Clone)]
enum Pending<T> {
    /// Create without a confirmed id yet; `entity_id` is filled by `bind`
    Create { entity: T, entity_id: Option<String> },
    Update { entity: T },
}

impl<T: Entity> Pending<T> {
    fn entity_id(&self) -> Option<&str> {
        match self {
            Pending::Create { entity_id, .. } => entity_id.as_deref(),
            Pending::Update { entity } => Some(entity.id()),
        }
    }
}

/// In-flight commands keyed by request id, in submission order.
#[derive(Debug, Clone)]
pub struct PendingOverlay<T: Entity> {
    entries: Vec<(RequestId, Pending<T>)>,
}

impl<T: Entity> Default for PendingOverlay<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Entity> PendingOverlay<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an optimistic create. The entity may carry a provisional id.
    pub fn record_create(&mut self, entity: T) -> RequestId {
        let request_id = Uuid::new_v4();
        let entity_id = Some(entity.id().to_string()).filter(|id| !id.is_empty());
        self.entries.push((request_id, Pending::Create { entity, entity_id }));
        request_id
    }

    /// Record an optimistic update carrying the full patched entity.
    pub fn record_update(&mut self, entity: T) -> RequestId {
        let request_id = Uuid::new_v4();
        self.entries.push((request_id, Pending::Update { entity }));
        request_id
    }

    /// Attach the id assigned by the source of truth to a pending create.
    pub fn bind(&mut self, request_id: RequestId, entity_id: &str) {
        for (rid, pending) in &mut self.entries {
            if *rid == request_id {
                if let Pending::Create { entity_id: slot, .. } = pending {
                    *slot = Some(entity_id.to_string());
                }
            }
        }
    }

    /// Drop every entry for an entity whose notification has been applied.
    /// Returns the number of entries reconciled away.
    pub fn confirm(&mut self, entity_id: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(_, pending)| pending.entity_id() != Some(entity_id));
        before - self.entries.len()
    }

    /// Drop a command that the source of truth rejected.
    pub fn fail(&mut self, request_id: RequestId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(rid, _)| *rid != request_id);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Confirmed collection with pending commands layered on top.
    ///
    /// Pending creates not yet in the store are prepended (latest first);
    /// pending updates replace the confirmed entity in place.
    pub fn merged_view(&self, store: &EntityStore<T>) -> Vec<T> {
        let mut updates: HashMap<&str, &T> = HashMap::new();
        for (_, pending) in &self.entries {
            if let Pending::Update { entity } = pending {
                updates.insert(entity.id(), entity);
            }
        }

        let mut view: Vec<T> = self
            .entries
            .iter()
            .rev()
            .filter_map(|(_, pending)| match pending {
                Pending::Create { entity, entity_id } => {
                    let confirmed = entity_id.as_deref().is_some_and(|id| store.contains(id));
                    (!confirmed).then(|| entity.clone())
                }
                Pending::Update { .. } => None,
            })
            .collect();

        view.extend(store.snapshot().iter().map(|confirmed| {
            updates
                .get(confirmed.id())
                .map_or_else(|| confirmed.clone(), |patched| (*patched).clone())
        }));

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeEvent, Signal, SignalStatus, SignalType};

    #[test]
    fn test_pending_create_visible_until_confirmed() {
        let mut store: EntityStore<Signal> = EntityStore::new();
        store.load(vec![Signal::new("a", SignalType::Purchase)]);

        let mut overlay = PendingOverlay::new();
        let rid = overlay.record_create(Signal::new("", SignalType::Incident));
        assert_eq!(overlay.merged_view(&store).len(), 2);

        overlay.bind(rid, "b");
        store.apply_change(ChangeEvent::Insert(Signal::new("b", SignalType::Incident)));
        assert_eq!(overlay.confirm("b"), 1);
        assert!(overlay.is_empty());

        let ids: Vec<String> = overlay.merged_view(&store).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_pending_update_shadows_confirmed() {
        let mut store: EntityStore<Signal> = EntityStore::new();
        store.load(vec![Signal::new("a", SignalType::Purchase)]);

        let mut overlay = PendingOverlay::new();
        let mut patched = Signal::new("a", SignalType::Purchase);
        patched.status = SignalStatus::Approved;
        let rid = overlay.record_update(patched);

        let view = overlay.merged_view(&store);
        assert_eq!(view[0].status, SignalStatus::Approved);
        // store untouched
        assert_eq!(store.snapshot()[0].status, SignalStatus::Pending);

        assert!(overlay.fail(rid));
        assert_eq!(overlay.merged_view(&store)[0].status, SignalStatus::Pending);
    }
}
