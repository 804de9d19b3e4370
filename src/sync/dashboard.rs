//! Dashboard State
//!
//! Owns the entity stores, the event aggregator and the health monitor.
//! Shared with consumers as `Arc<RwLock<Dashboard>>`. The stores change only
//! in response to confirmed notifications from the sync loop; commands in
//! flight live in a separate pending overlay until their notification lands.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::aggregator::TensionAggregator;
use crate::classification::Classifier;
use crate::config::PulseConfig;
use crate::health::{HealthFacade, HealthMonitor};
use crate::pulse::{group_by_pulse_state, PulseGroups};
use crate::store::notification::decode_change;
use crate::store::overlay::{PendingOverlay, RequestId};
use crate::store::{ChangeOutcome, EntityStore};
use crate::types::{
    ChangeEvent, GroupedSignals, HealthChange, HealthSnapshot, MaintenanceTicket, Signal,
    SignalPatch,
};

/// Reconciliation counters, for the collaborator to log or export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Notifications that changed a collection
    pub applied: u64,
    /// Well-formed notifications that were no-ops (duplicates, missing deletes)
    pub ignored: u64,
    /// Malformed notifications dropped at the boundary
    pub rejected: u64,
}

/// Live, locally reconciled view of signals and tickets.
#[derive(Debug)]
pub struct Dashboard {
    signals: EntityStore<Signal>,
    tickets: EntityStore<MaintenanceTicket>,
    pending: PendingOverlay<Signal>,
    aggregator: TensionAggregator,
    classifier: Classifier,
    facade: HealthFacade,
    monitor: HealthMonitor,
    signals_loading: bool,
    tickets_loading: bool,
    stats: ReconcileStats,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(&PulseConfig::default())
    }
}

impl Dashboard {
    pub fn new(config: &PulseConfig) -> Self {
        Self {
            signals: EntityStore::new(),
            tickets: EntityStore::new(),
            pending: PendingOverlay::new(),
            aggregator: TensionAggregator::new(config.tension.clone(), config.activity.clone()),
            classifier: Classifier::new(config.classification.clone()),
            facade: HealthFacade::new(config.tension.clone()),
            monitor: HealthMonitor::new(config.health.change_channel_capacity),
            signals_loading: false,
            tickets_loading: false,
            stats: ReconcileStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    pub fn signals(&self) -> &[Signal] {
        self.signals.snapshot()
    }

    pub fn tickets(&self) -> &[MaintenanceTicket] {
        self.tickets.snapshot()
    }

    pub fn signal_store(&self) -> &EntityStore<Signal> {
        &self.signals
    }

    pub fn ticket_store(&self) -> &EntityStore<MaintenanceTicket> {
        &self.tickets
    }

    pub fn signals_loading(&self) -> bool {
        self.signals_loading
    }

    pub fn tickets_loading(&self) -> bool {
        self.tickets_loading
    }

    pub fn is_loading(&self) -> bool {
        self.signals_loading || self.tickets_loading
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    pub fn aggregator(&self) -> &TensionAggregator {
        &self.aggregator
    }

    /// Current signals classified and partitioned by decision type.
    pub fn classified(&self) -> GroupedSignals {
        self.classifier.classify_and_group(self.signals())
    }

    /// Current signals grouped by pipeline state.
    pub fn pulse_groups(&self) -> PulseGroups {
        group_by_pulse_state(self.signals())
    }

    /// Health computed from the current stores and event window.
    pub fn health(&self) -> HealthSnapshot {
        self.facade
            .snapshot(self.signals(), self.tickets(), &self.aggregator)
    }

    /// Kept for API compatibility: health is recomputed on every read.
    pub fn refresh_health(&self) {}

    pub fn subscribe_health(&self) -> broadcast::Receiver<HealthChange> {
        self.monitor.subscribe()
    }

    // ------------------------------------------------------------------
    // Pending commands
    // ------------------------------------------------------------------

    /// Confirmed signals with in-flight commands layered on top.
    pub fn merged_signals(&self) -> Vec<Signal> {
        self.pending.merged_view(&self.signals)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn record_pending_create(&mut self, draft: Signal) -> RequestId {
        self.pending.record_create(draft)
    }

    /// Record an update against the confirmed signal. Unknown ids have
    /// nothing to shadow and are not recorded.
    pub fn record_pending_update(&mut self, id: &str, patch: &SignalPatch) -> Option<RequestId> {
        let mut patched = self.signals.get(id)?.clone();
        patch.apply_to(&mut patched);
        Some(self.pending.record_update(patched))
    }

    /// Attach the backend-assigned id to a pending create. The notification
    /// may already have landed, in which case the entry is dropped at once.
    pub fn bind_pending(&mut self, request_id: RequestId, entity_id: &str) {
        self.pending.bind(request_id, entity_id);
        if self.signals.contains(entity_id) {
            self.pending.confirm(entity_id);
        }
    }

    pub fn fail_pending(&mut self, request_id: RequestId) -> bool {
        self.pending.fail(request_id)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    pub fn set_signals_loading(&mut self, loading: bool) {
        self.signals_loading = loading;
    }

    pub fn set_tickets_loading(&mut self, loading: bool) {
        self.tickets_loading = loading;
    }

    pub fn load_signals(&mut self, signals: Vec<Signal>) {
        self.signals.load(signals);
        self.signals_loading = false;
        self.observe_health();
    }

    pub fn load_tickets(&mut self, tickets: Vec<MaintenanceTicket>) {
        self.tickets.load(tickets);
        self.tickets_loading = false;
    }

    // ------------------------------------------------------------------
    // Reconciliation entry points
    // ------------------------------------------------------------------

    /// Apply a decoded signal change, record the transition in the event
    /// window and re-evaluate health.
    pub fn apply_signal_change(&mut self, change: ChangeEvent<Signal>) -> ChangeOutcome<Signal> {
        let touched_id = match &change {
            ChangeEvent::Insert(s) | ChangeEvent::Update(s) => s.id.clone(),
            ChangeEvent::Delete { id } => id.clone(),
        };

        let outcome = self.signals.apply_change(change);
        self.count(&outcome);

        if outcome.mutated() {
            let current = self.signals.get(&touched_id);
            self.aggregator.record_outcome(current, &outcome);
            let reconciled = self.pending.confirm(&touched_id);
            if reconciled > 0 {
                debug!(id = %touched_id, reconciled, "Pending commands confirmed");
            }
            self.observe_health();
        }

        outcome
    }

    pub fn apply_ticket_change(
        &mut self,
        change: ChangeEvent<MaintenanceTicket>,
    ) -> ChangeOutcome<MaintenanceTicket> {
        let outcome = self.tickets.apply_change(change);
        self.count(&outcome);
        outcome
    }

    /// Decode and apply a raw signal notification. Malformed messages are
    /// logged, counted and dropped; they never reach the store.
    pub fn apply_signal_notification(&mut self, raw: Value) -> Option<ChangeOutcome<Signal>> {
        match decode_change::<Signal>(raw) {
            Ok(change) => Some(self.apply_signal_change(change)),
            Err(e) => {
                self.stats.rejected += 1;
                warn!(kind = "signals", error = %e, "Dropping malformed notification");
                None
            }
        }
    }

    pub fn apply_ticket_notification(
        &mut self,
        raw: Value,
    ) -> Option<ChangeOutcome<MaintenanceTicket>> {
        match decode_change::<MaintenanceTicket>(raw) {
            Ok(change) => Some(self.apply_ticket_change(change)),
            Err(e) => {
                self.stats.rejected += 1;
                warn!(kind = "tickets", error = %e, "Dropping malformed notification");
                None
            }
        }
    }

    fn count<T>(&mut self, outcome: &ChangeOutcome<T>) {
        match outcome {
            ChangeOutcome::Rejected { .. } => self.stats.rejected += 1,
            o if o.mutated() => self.stats.applied += 1,
            _ => self.stats.ignored += 1,
        }
    }

    fn observe_health(&mut self) {
        let level = self.health().health_level;
        self.monitor.observe(level);
    }
}
