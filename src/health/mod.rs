//! Health Facade
//!
//! Projects the live signal snapshot, the ticket snapshot and the rolling
//! event window into one [`HealthSnapshot`]. Nothing is cached: every call
//! reads the current inputs, so a snapshot can never be stale.
//!
//! [`HealthMonitor`] turns level transitions into [`HealthChange`] events on
//! a broadcast channel, for presentation layers that restyle on change.

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::aggregator::{tension_level, TensionAggregator};
use crate::config::TensionConfig;
use crate::pulse::count_by_pulse_state;
use crate::types::{HealthChange, HealthLevel, HealthSnapshot, MaintenanceTicket, Signal};

// ============================================================================
// Facade
// ============================================================================

/// Read-time composition of the pipeline mapper and the aggregator.
#[derive(Debug, Clone, Default)]
pub struct HealthFacade {
    thresholds: TensionConfig,
}

impl HealthFacade {
    pub fn new(thresholds: TensionConfig) -> Self {
        Self { thresholds }
    }

    pub fn snapshot(
        &self,
        signals: &[Signal],
        tickets: &[MaintenanceTicket],
        aggregator: &TensionAggregator,
    ) -> HealthSnapshot {
        let tension = aggregator.tension(signals);
        let health_level = tension_level(
            tension.critical_count,
            tension.urgent_count,
            tension.pending_count,
            &self.thresholds,
        );

        HealthSnapshot {
            health_level,
            tension_level: tension.level,
            pending_decisions: tension.pending_count,
            critical_count: tension.critical_count,
            urgent_count: tension.urgent_count,
            recent_events: aggregator.recent_events(),
            activity_summary: aggregator.activity_summary(signals),
            pipeline: count_by_pulse_state(signals),
            open_tickets: tickets.iter().filter(|t| t.is_open()).count(),
        }
    }
}

// ============================================================================
// Monitor
// ============================================================================

/// Publishes a [`HealthChange`] each time the observed level moves.
#[derive(Debug)]
pub struct HealthMonitor {
    last_level: Option<HealthLevel>,
    tx: broadcast::Sender<HealthChange>,
}

impl HealthMonitor {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            last_level: None,
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthChange> {
        self.tx.subscribe()
    }

    pub fn last_level(&self) -> Option<HealthLevel> {
        self.last_level
    }

    /// Compare against the last observed level and publish on change.
    ///
    /// The first observation only primes the monitor unless it is already
    /// above stable.
    pub fn observe(&mut self, level: HealthLevel) -> Option<HealthChange> {
        let from = match self.last_level.replace(level) {
            Some(prev) if prev == level => return None,
            Some(prev) => prev,
            None if level == HealthLevel::Stable => return None,
            None => HealthLevel::Stable,
        };

        let change = HealthChange {
            from,
            to: level,
            at: Utc::now(),
        };

        if change.is_escalation() {
            warn!(from = %from, to = %level, class = level.css_class(), "Health level escalated");
        } else {
            info!(from = %from, to = %level, class = level.css_class(), "Health level relaxed");
        }

        if self.tx.send(change.clone()).is_err() {
            debug!("No health subscribers");
        }

        Some(change)
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(crate::config::defaults::HEALTH_CHANGE_CHANNEL_CAPACITY)
    }
}
