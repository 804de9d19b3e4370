//! Sync loop: snapshot load, then live reconciliation until cancelled.
//!
//! Subscriptions are opened before the snapshot is fetched so nothing that
//! happens in between is lost. Notifications buffered during the fetch are
//! applied afterwards; store semantics make the replay harmless
//! (duplicate inserts and deletes of missing ids are no-ops).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{SignalBackend, Subscription, TransportError};
use super::dashboard::Dashboard;
use crate::types::{EntityKind, MaintenanceTicket, Signal};

/// Final counters returned by [`SyncLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub signals_loaded: usize,
    pub tickets_loaded: usize,
    pub signal_notifications: u64,
    pub ticket_notifications: u64,
    /// Notifications dropped as malformed
    pub rejected: u64,
    /// True when the loop stopped because of cancellation
    pub cancelled: bool,
}

/// Why the live phase ended.
enum Exit {
    Cancelled,
    FeedsClosed,
}

/// Owns everything needed to keep a [`Dashboard`] reconciled with a backend.
pub struct SyncLoop<B: SignalBackend> {
    backend: Arc<B>,
    dashboard: Arc<RwLock<Dashboard>>,
    cancel_token: CancellationToken,
}

impl<B: SignalBackend> SyncLoop<B> {
    pub fn new(
        backend: Arc<B>,
        dashboard: Arc<RwLock<Dashboard>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            backend,
            dashboard,
            cancel_token,
        }
    }

    /// Run until cancellation or until both change feeds close.
    ///
    /// Errors only during setup (subscribe / initial fetch); loading flags
    /// are cleared on that path too.
    pub async fn run(self) -> Result<SyncStats, TransportError> {
        let mut stats = SyncStats::default();
        info!(backend = self.backend.backend_name(), "Starting dashboard sync");

        {
            let mut dashboard = self.dashboard.write().await;
            dashboard.set_signals_loading(true);
            dashboard.set_tickets_loading(true);
        }

        let (signal_sub, ticket_sub) = match self.setup(&mut stats).await {
            Ok(subs) => subs,
            Err(e) => {
                let mut dashboard = self.dashboard.write().await;
                dashboard.set_signals_loading(false);
                dashboard.set_tickets_loading(false);
                warn!(error = %e, "Dashboard sync setup failed");
                return Err(e);
            }
        };

        let signal_handle = signal_sub.handle;
        let ticket_handle = ticket_sub.handle;

        let exit = self.live(signal_sub, ticket_sub, &mut stats).await;
        stats.cancelled = matches!(exit, Exit::Cancelled);

        for handle in [signal_handle, ticket_handle] {
            if let Err(e) = self.backend.unsubscribe(handle).await {
                warn!(kind = %handle.kind, error = %e, "Failed to release subscription");
            }
        }

        stats.rejected = self.dashboard.read().await.stats().rejected;
        info!(
            signals = stats.signal_notifications,
            tickets = stats.ticket_notifications,
            rejected = stats.rejected,
            cancelled = stats.cancelled,
            "Dashboard sync stopped"
        );
        Ok(stats)
    }

    async fn setup(
        &self,
        stats: &mut SyncStats,
    ) -> Result<(Subscription, Subscription), TransportError> {
        let signal_sub = self.backend.subscribe(EntityKind::Signals).await?;
        let ticket_sub = match self.backend.subscribe(EntityKind::Tickets).await {
            Ok(sub) => sub,
            Err(e) => {
                let _ = self.backend.unsubscribe(signal_sub.handle).await;
                return Err(e);
            }
        };

        if let Err(e) = self.load_snapshots(stats).await {
            for handle in [signal_sub.handle, ticket_sub.handle] {
                let _ = self.backend.unsubscribe(handle).await;
            }
            return Err(e);
        }
        Ok((signal_sub, ticket_sub))
    }

    async fn load_snapshots(&self, stats: &mut SyncStats) -> Result<(), TransportError> {
        let signals: Vec<Signal> = self.fetch(EntityKind::Signals).await?;
        stats.signals_loaded = signals.len();
        self.dashboard.write().await.load_signals(signals);

        let tickets: Vec<MaintenanceTicket> = self.fetch(EntityKind::Tickets).await?;
        stats.tickets_loaded = tickets.len();
        self.dashboard.write().await.load_tickets(tickets);

        info!(
            signals = stats.signals_loaded,
            tickets = stats.tickets_loaded,
            "Initial snapshot loaded"
        );
        Ok(())
    }

    /// Fetch a snapshot and decode it, skipping rows that do not parse.
    async fn fetch<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Vec<T>, TransportError> {
        let rows = self.backend.fetch_all(kind).await?;
        let total = rows.len();
        let entities: Vec<T> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Skipping undecodable snapshot row");
                    None
                }
            })
            .collect();
        debug!(kind = %kind, total, decoded = entities.len(), "Fetched snapshot");
        Ok(entities)
    }

    async fn live(
        &self,
        mut signal_sub: Subscription,
        mut ticket_sub: Subscription,
        stats: &mut SyncStats,
    ) -> Exit {
        let mut signals_open = true;
        let mut tickets_open = true;

        while signals_open || tickets_open {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("Sync cancelled");
                    return Exit::Cancelled;
                }
                msg = signal_sub.receiver.recv(), if signals_open => match msg {
                    Some(raw) => {
                        stats.signal_notifications += 1;
                        self.apply(EntityKind::Signals, raw).await;
                    }
                    None => {
                        debug!("Signal feed closed");
                        signals_open = false;
                    }
                },
                msg = ticket_sub.receiver.recv(), if tickets_open => match msg {
                    Some(raw) => {
                        stats.ticket_notifications += 1;
                        self.apply(EntityKind::Tickets, raw).await;
                    }
                    None => {
                        debug!("Ticket feed closed");
                        tickets_open = false;
                    }
                },
            }
        }

        info!("All change feeds closed");
        Exit::FeedsClosed
    }

    async fn apply(&self, kind: EntityKind, raw: Value) {
        // Checked again under the lock: nothing lands after cancellation.
        let mut dashboard = self.dashboard.write().await;
        if self.cancel_token.is_cancelled() {
            return;
        }
        match kind {
            EntityKind::Signals => {
                if let Some(outcome) = dashboard.apply_signal_notification(raw) {
                    debug!(outcome = outcome.label(), "Signal notification applied");
                }
            }
            EntityKind::Tickets => {
                if let Some(outcome) = dashboard.apply_ticket_notification(raw) {
                    debug!(outcome = outcome.label(), "Ticket notification applied");
                }
            }
        }
    }
}
