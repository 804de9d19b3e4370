//! Entity Store
//!
//! Locally cached, newest-first collections of entities reconciled against
//! change notifications from the source of truth. The store only changes on
//! confirmed notifications; it never throws and never holds two entities
//! with the same id.
//!
//! | Change | Id present               | Id absent                  |
//! |--------|--------------------------|----------------------------|
//! | INSERT | no-op (duplicate)        | prepend                    |
//! | UPDATE | replace in place         | prepend (missed insert)    |
//! | DELETE | remove                   | no-op                      |

pub mod notification;
pub mod overlay;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::types::{ChangeEvent, EntityKind, MaintenanceTicket, Signal};

// ============================================================================
// Entity Trait
// ============================================================================

/// Anything the store can reconcile.
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Blank ids never enter a store.
    fn has_id(&self) -> bool {
        !self.id().trim().is_empty()
    }

    /// Creation time used for newest-first ordering of snapshots.
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

impl Entity for Signal {
    const KIND: EntityKind = EntityKind::Signals;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Entity for MaintenanceTicket {
    const KIND: EntityKind = EntityKind::Tickets;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

// ============================================================================
// Change Outcome
// ============================================================================

/// Result of applying one change. Returned instead of raised so callers can
/// log and count without the store ever failing.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome<T> {
    Inserted,
    /// Carries the entity as it was before the update
    Updated { previous: T },
    /// UPDATE for an id we never saw; applied as an insert
    UpsertedMissing,
    Deleted { previous: T },
    DuplicateInsert,
    DeleteMissing,
    Rejected { reason: String },
}

impl<T> ChangeOutcome<T> {
    /// Whether the collection changed.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            ChangeOutcome::Inserted
                | ChangeOutcome::Updated { .. }
                | ChangeOutcome::UpsertedMissing
                | ChangeOutcome::Deleted { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeOutcome::Inserted => "inserted",
            ChangeOutcome::Updated { .. } => "updated",
            ChangeOutcome::UpsertedMissing => "upserted_missing",
            ChangeOutcome::Deleted { .. } => "deleted",
            ChangeOutcome::DuplicateInsert => "duplicate_insert",
            ChangeOutcome::DeleteMissing => "delete_missing",
            ChangeOutcome::Rejected { .. } => "rejected",
        }
    }
}

// ============================================================================
// Entity Store
// ============================================================================

/// Ordered (newest-first) collection of one entity kind.
#[derive(Debug, Clone)]
pub struct EntityStore<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collection wholesale from a point-in-time snapshot.
    ///
    /// Entities with an empty id are dropped and repeated ids keep their
    /// first occurrence. The result is sorted newest-first by creation time
    /// (stable; undated entities keep their relative order at the end).
    pub fn load(&mut self, initial: Vec<T>) {
        let received = initial.len();
        let mut seen: HashSet<String> = HashSet::with_capacity(received);
        let mut items: Vec<T> = initial
            .into_iter()
            .filter(|e| e.has_id() && seen.insert(e.id().to_string()))
            .collect();

        items.sort_by(|a, b| match (a.created_at(), b.created_at()) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        if items.len() != received {
            warn!(
                kind = %T::KIND,
                received,
                kept = items.len(),
                "Snapshot contained entities without id or with duplicate ids"
            );
        }
        debug!(kind = %T::KIND, count = items.len(), "Entity store loaded");

        self.items = items;
    }

    /// Apply one decoded change notification.
    pub fn apply_change(&mut self, change: ChangeEvent<T>) -> ChangeOutcome<T> {
        let change_type = change.change_type();
        let outcome = match change {
            ChangeEvent::Insert(entity) => self.insert(entity),
            ChangeEvent::Update(entity) => self.update(entity),
            ChangeEvent::Delete { id } => self.delete(&id),
        };

        match &outcome {
            ChangeOutcome::Rejected { reason } => {
                warn!(kind = %T::KIND, change = %change_type, reason = %reason, "Change rejected");
            }
            other => {
                debug!(kind = %T::KIND, change = %change_type, outcome = other.label(), "Change applied");
            }
        }

        outcome
    }

    fn insert(&mut self, entity: T) -> ChangeOutcome<T> {
        if !entity.has_id() {
            return ChangeOutcome::Rejected {
                reason: "entity has no id".to_string(),
            };
        }
        if self.position(entity.id()).is_some() {
            return ChangeOutcome::DuplicateInsert;
        }
        self.items.insert(0, entity);
        ChangeOutcome::Inserted
    }

    fn update(&mut self, entity: T) -> ChangeOutcome<T> {
        if !entity.has_id() {
            return ChangeOutcome::Rejected {
                reason: "entity has no id".to_string(),
            };
        }
        match self.position(entity.id()) {
            Some(idx) => {
                let previous = std::mem::replace(&mut self.items[idx], entity);
                ChangeOutcome::Updated { previous }
            }
            None => {
                self.items.insert(0, entity);
                ChangeOutcome::UpsertedMissing
            }
        }
    }

    fn delete(&mut self, id: &str) -> ChangeOutcome<T> {
        if id.trim().is_empty() {
            return ChangeOutcome::Rejected {
                reason: "delete without id".to_string(),
            };
        }
        match self.position(id) {
            Some(idx) => ChangeOutcome::Deleted {
                previous: self.items.remove(idx),
            },
            None => ChangeOutcome::DeleteMissing,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|e| e.id() == id)
    }

    /// Current collection, newest first.
    pub fn snapshot(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
