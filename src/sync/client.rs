//! Commands against the source of truth.
//!
//! Commands never touch the entity stores: a successful insert or update
//! becomes confirmed only when its change notification comes back through
//! the sync loop. A client built with [`DashboardClient::with_pending`]
//! records signal commands in the dashboard's pending overlay while they are
//! in flight; failures drop the entry, notifications reconcile it away.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::backend::{SignalBackend, TransportError};
use super::dashboard::Dashboard;
use crate::store::overlay::RequestId;
use crate::types::{EntityKind, MaintenanceTicket, Signal, SignalPatch, TicketPatch};

/// Thin command façade over a [`SignalBackend`].
pub struct DashboardClient<B: SignalBackend> {
    backend: Arc<B>,
    pending: Option<Arc<RwLock<Dashboard>>>,
}

impl<B: SignalBackend> Clone for DashboardClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            pending: self.pending.clone(),
        }
    }
}

impl<B: SignalBackend> DashboardClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            pending: None,
        }
    }

    /// Track signal commands in `dashboard`'s pending overlay.
    pub fn with_pending(mut self, dashboard: Arc<RwLock<Dashboard>>) -> Self {
        self.pending = Some(dashboard);
        self
    }

    /// Create a signal. The returned entity carries the id and timestamp
    /// assigned by the backend; an empty `id` on input asks the backend to
    /// assign one.
    pub async fn add_signal(&self, signal: &Signal) -> Result<Signal, TransportError> {
        let request = match &self.pending {
            Some(dashboard) => Some(dashboard.write().await.record_pending_create(signal.clone())),
            None => None,
        };

        let result = self.insert(EntityKind::Signals, signal).await;
        if let (Some(dashboard), Some(request_id)) = (&self.pending, request) {
            let mut dashboard = dashboard.write().await;
            match &result {
                Ok(stored) => dashboard.bind_pending(request_id, &stored.id),
                Err(_) => {
                    dashboard.fail_pending(request_id);
                }
            }
        }
        result
    }

    pub async fn update_signal(&self, id: &str, patch: &SignalPatch) -> Result<Signal, TransportError> {
        let request: Option<RequestId> = match &self.pending {
            Some(dashboard) => dashboard.write().await.record_pending_update(id, patch),
            None => None,
        };

        let result = self.update(EntityKind::Signals, id, patch).await;
        if let (Some(dashboard), Some(request_id), Err(_)) = (&self.pending, request, &result) {
            dashboard.write().await.fail_pending(request_id);
        }
        result
    }

    pub async fn create_ticket(
        &self,
        ticket: &MaintenanceTicket,
    ) -> Result<MaintenanceTicket, TransportError> {
        self.insert(EntityKind::Tickets, ticket).await
    }

    pub async fn update_ticket(
        &self,
        id: &str,
        patch: &TicketPatch,
    ) -> Result<MaintenanceTicket, TransportError> {
        self.update(EntityKind::Tickets, id, patch).await
    }

    async fn insert<T>(&self, kind: EntityKind, entity: &T) -> Result<T, TransportError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut payload = serde_json::to_value(entity)?;
        // Let the backend assign ids for drafts.
        if let Some(obj) = payload.as_object_mut() {
            if obj.get("id").and_then(|v| v.as_str()).is_some_and(str::is_empty) {
                obj.remove("id");
            }
        }

        let stored = self.backend.insert(kind, payload).await.map_err(|e| {
            warn!(kind = %kind, error = %e, "Insert failed");
            e
        })?;
        debug!(kind = %kind, id = ?stored.get("id"), "Insert accepted");
        Ok(serde_json::from_value(stored)?)
    }

    async fn update<T, P>(&self, kind: EntityKind, id: &str, patch: &P) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let fields = serde_json::to_value(patch)?;
        let stored = self.backend.update(kind, id, fields).await.map_err(|e| {
            warn!(kind = %kind, id, error = %e, "Update failed");
            e
        })?;
        debug!(kind = %kind, id, "Update accepted");
        Ok(serde_json::from_value(stored)?)
    }
}
