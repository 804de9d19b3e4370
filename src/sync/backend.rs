//! Transport abstraction for the remote source of truth.
//!
//! Payloads are plain JSON values: the collaborator owns the wire format,
//! the core only decodes what it needs.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::EntityKind;

/// Transport failures, surfaced to the caller of a command or query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("{kind} entity '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("subscription closed")]
    Closed,
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

/// Opaque handle identifying one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: u64,
    pub kind: EntityKind,
}

/// A live change feed for one entity kind.
///
/// Dropping the receiver stops delivery locally; `unsubscribe` releases the
/// handle on the backend side.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub receiver: mpsc::Receiver<Value>,
}

/// Everything the core needs from the persistence/transport collaborator.
///
/// Delivery is assumed in order and at least once per entity id.
#[async_trait]
pub trait SignalBackend: Send + Sync + 'static {
    /// Point-in-time snapshot, newest first.
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, TransportError>;

    /// Open a change feed. Each message is a raw notification envelope.
    async fn subscribe(&self, kind: EntityKind) -> Result<Subscription, TransportError>;

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), TransportError>;

    /// Create an entity; returns it as stored (id and timestamps assigned).
    async fn insert(&self, kind: EntityKind, entity: Value) -> Result<Value, TransportError>;

    /// Patch an entity; returns the full entity after the update.
    async fn update(&self, kind: EntityKind, id: &str, fields: Value) -> Result<Value, TransportError>;

    /// Human-readable name for logging (e.g. "memory", "replay").
    fn backend_name(&self) -> &str;
}
