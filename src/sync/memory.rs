//! In-process backend
//!
//! Holds both collections in memory, assigns ids and timestamps on insert,
//! and fans change notifications out to every open subscription of the
//! matching kind. Used by tests and local demos in place of a remote store.
//!
//! Writes fan out while still holding the table lock, so notifications
//! leave in commit order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::{SignalBackend, Subscription, SubscriptionHandle, TransportError};
use crate::config::defaults::SUBSCRIPTION_CHANNEL_CAPACITY;
use crate::types::{id_from_value, EntityKind};

#[derive(Default)]
struct Tables {
    signals: Vec<Value>,
    tickets: Vec<Value>,
    subscribers: HashMap<u64, (EntityKind, mpsc::Sender<Value>)>,
}

impl Tables {
    fn rows_mut(&mut self, kind: EntityKind) -> &mut Vec<Value> {
        match kind {
            EntityKind::Signals => &mut self.signals,
            EntityKind::Tickets => &mut self.tickets,
        }
    }

    fn senders(&self, kind: EntityKind) -> Vec<mpsc::Sender<Value>> {
        self.subscribers
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, tx)| tx.clone())
            .collect()
    }
}

/// In-memory source of truth.
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    next_subscription: AtomicU64,
    available: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            next_subscription: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Seed a collection without emitting notifications. Rows are expected
    /// newest first.
    pub async fn seed(&self, kind: EntityKind, rows: Vec<Value>) {
        *self.tables.lock().await.rows_mut(kind) = rows;
    }

    /// Simulate an outage: every call fails with `Unavailable` while false.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Remove an entity and emit a DELETE notification.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), TransportError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let rows = tables.rows_mut(kind);
        let before = rows.len();
        rows.retain(|row| row_id(row).as_deref() != Some(id));
        if rows.len() == before {
            return Err(TransportError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        fan_out(
            tables.senders(kind),
            json!({ "eventType": "DELETE", "old": { "id": id } }),
        )
        .await;
        Ok(())
    }

    /// Push an arbitrary envelope to subscribers without touching the
    /// tables. Lets tests exercise duplicate or malformed deliveries.
    pub async fn emit_raw(&self, kind: EntityKind, envelope: Value) {
        let senders = self.tables.lock().await.senders(kind);
        fan_out(senders, envelope).await;
    }

    /// Drop every subscription sender, closing all change feeds.
    pub async fn close_feeds(&self) {
        self.tables.lock().await.subscribers.clear();
    }

    pub async fn subscriber_count(&self) -> usize {
        self.tables.lock().await.subscribers.len()
    }

    fn check_available(&self) -> Result<(), TransportError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unavailable("memory backend offline".to_string()))
        }
    }
}

#[async_trait]
impl SignalBackend for MemoryBackend {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, TransportError> {
        self.check_available()?;
        Ok(self.tables.lock().await.rows_mut(kind).clone())
    }

    async fn subscribe(&self, kind: EntityKind) -> Result<Subscription, TransportError> {
        self.check_available()?;
        let (tx, receiver) = mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().await.subscribers.insert(id, (kind, tx));
        debug!(kind = %kind, id, "Subscription opened");
        Ok(Subscription {
            handle: SubscriptionHandle { id, kind },
            receiver,
        })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), TransportError> {
        self.tables.lock().await.subscribers.remove(&handle.id);
        debug!(kind = %handle.kind, id = handle.id, "Subscription released");
        Ok(())
    }

    async fn insert(&self, kind: EntityKind, entity: Value) -> Result<Value, TransportError> {
        self.check_available()?;
        let Value::Object(mut fields) = entity else {
            return Err(TransportError::Rejected("entity must be a JSON object".to_string()));
        };

        let id = match fields.get("id").and_then(id_from_value) {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        fields.insert("id".to_string(), Value::String(id.clone()));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        let stored = Value::Object(fields);

        let mut tables = self.tables.lock().await;
        let rows = tables.rows_mut(kind);
        if rows.iter().any(|row| row_id(row).as_deref() == Some(id.as_str())) {
            return Err(TransportError::Rejected(format!("duplicate id '{id}'")));
        }
        rows.insert(0, stored.clone());

        fan_out(tables.senders(kind), json!({ "eventType": "INSERT", "new": stored.clone() })).await;
        Ok(stored)
    }

    async fn update(&self, kind: EntityKind, id: &str, fields: Value) -> Result<Value, TransportError> {
        self.check_available()?;
        let Value::Object(patch) = fields else {
            return Err(TransportError::Rejected("update fields must be a JSON object".to_string()));
        };

        let mut tables = self.tables.lock().await;
        let row = tables
            .rows_mut(kind)
            .iter_mut()
            .find(|row| row_id(row).as_deref() == Some(id))
            .ok_or_else(|| TransportError::NotFound {
                kind,
                id: id.to_string(),
            })?;
        merge(row, patch);
        let stored = row.clone();

        fan_out(tables.senders(kind), json!({ "eventType": "UPDATE", "new": stored.clone() })).await;
        Ok(stored)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

fn row_id(row: &Value) -> Option<String> {
    row.get("id").and_then(id_from_value)
}

/// Shallow merge; the id is immutable.
fn merge(row: &mut Value, patch: Map<String, Value>) {
    if let Value::Object(target) = row {
        for (key, value) in patch {
            if key != "id" {
                target.insert(key, value);
            }
        }
    }
}

async fn fan_out(senders: Vec<mpsc::Sender<Value>>, envelope: Value) {
    for tx in senders {
        if tx.send(envelope.clone()).await.is_err() {
            warn!("Dropping notification for closed subscriber");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_id_and_notifies() {
        let backend = MemoryBackend::new();
        let mut sub = backend.subscribe(EntityKind::Signals).await.unwrap();

        let stored = backend
            .insert(EntityKind::Signals, json!({ "signal_type": "purchase" }))
            .await
            .unwrap();
        let id = stored["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert!(stored.get("created_at").is_some());

        let envelope = sub.receiver.recv().await.unwrap();
        assert_eq!(envelope["eventType"], "INSERT");
        assert_eq!(envelope["new"]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_update_merges_and_missing_is_not_found() {
        let backend = MemoryBackend::new();
        backend
            .seed(EntityKind::Tickets, vec![json!({ "id": "t1", "title": "Door", "status": "open" })])
            .await;

        let stored = backend
            .update(EntityKind::Tickets, "t1", json!({ "status": "closed", "id": "nope" }))
            .await
            .unwrap();
        assert_eq!(stored["status"], "closed");
        assert_eq!(stored["id"], "t1");
        assert_eq!(stored["title"], "Door");

        let err = backend
            .update(EntityKind::Tickets, "t9", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_calls() {
        let backend = MemoryBackend::new();
        backend.set_available(false);
        let err = backend.fetch_all(EntityKind::Signals).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_notifications_scoped_to_kind() {
        let backend = MemoryBackend::new();
        let mut tickets = backend.subscribe(EntityKind::Tickets).await.unwrap();
        backend
            .insert(EntityKind::Signals, json!({ "id": "s1" }))
            .await
            .unwrap();
        assert!(tickets.receiver.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_notify_in_commit_order() {
        let backend = std::sync::Arc::new(MemoryBackend::new());
        backend
            .seed(EntityKind::Signals, vec![json!({ "id": 5, "amount": 0 })])
            .await;
        let mut sub = backend.subscribe(EntityKind::Signals).await.unwrap();

        let writers: Vec<_> = (1..=64)
            .map(|n| {
                let backend = std::sync::Arc::clone(&backend);
                tokio::spawn(async move {
                    backend
                        .update(EntityKind::Signals, "5", json!({ "amount": n }))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let mut last = None;
        while let Ok(envelope) = sub.receiver.try_recv() {
            last = Some(envelope["new"]["amount"].clone());
        }
        let committed = backend.fetch_all(EntityKind::Signals).await.unwrap()[0]["amount"].clone();
        assert_eq!(last, Some(committed));
    }
}
