//! Event/Tension Aggregator
//!
//! Keeps a bounded rolling window of recent signal transitions and derives
//! tension and activity figures from the live signal snapshot.
//!
//! ## Tension Levels
//!
//! - **Critical**: at least one critical-urgency signal
//! - **Elevated**: urgent count above threshold, or pending decisions above threshold
//! - **Stable**: otherwise

use std::collections::VecDeque;

use crate::config::{ActivityConfig, TensionConfig};
use crate::store::ChangeOutcome;
use crate::types::{
    ActivitySummary, HealthLevel, Signal, SignalEvent, SignalEventKind, SignalStatus,
    TensionSnapshot, Urgency,
};

// ============================================================================
// Event Window
// ============================================================================

/// Fixed-capacity ring of events, newest at the front.
#[derive(Debug, Clone)]
pub struct EventWindow {
    events: VecDeque<SignalEvent>,
    capacity: usize,
}

impl EventWindow {
    /// A zero capacity is bumped to one so the window can always hold the
    /// latest event.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest beyond capacity.
    pub fn push(&mut self, event: SignalEvent) {
        self.events.push_front(event);
        while self.events.len() > self.capacity {
            self.events.pop_back();
        }
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &SignalEvent> {
        self.events.iter()
    }

    /// Up to `limit` most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<SignalEvent> {
        self.events.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Rolling window plus the thresholds used to read it.
#[derive(Debug, Clone)]
pub struct TensionAggregator {
    window: EventWindow,
    tension: TensionConfig,
    activity: ActivityConfig,
}

impl Default for TensionAggregator {
    fn default() -> Self {
        Self::new(TensionConfig::default(), ActivityConfig::default())
    }
}

impl TensionAggregator {
    pub fn new(tension: TensionConfig, activity: ActivityConfig) -> Self {
        Self {
            window: EventWindow::new(activity.event_window_capacity),
            tension,
            activity,
        }
    }

    pub fn record(&mut self, event: SignalEvent) {
        tracing::trace!(
            signal_id = %event.signal_id,
            kind = event.kind.short_code(),
            "Signal event recorded"
        );
        self.window.push(event);
    }

    /// Translate a store outcome into a window event. Non-mutating outcomes
    /// record nothing. Returns whether an event was recorded.
    pub fn record_outcome(&mut self, current: Option<&Signal>, outcome: &ChangeOutcome<Signal>) -> bool {
        let event = match (outcome, current) {
            (ChangeOutcome::Inserted | ChangeOutcome::UpsertedMissing, Some(signal)) => {
                SignalEvent::new(&signal.id, SignalEventKind::Created)
            }
            (ChangeOutcome::Updated { previous }, Some(signal)) => {
                let kind = if previous.status != signal.status {
                    SignalEventKind::StatusChanged {
                        from: previous.status.clone(),
                        to: signal.status.clone(),
                    }
                } else {
                    SignalEventKind::Updated
                };
                SignalEvent::new(&signal.id, kind)
            }
            (ChangeOutcome::Deleted { previous }, _) => {
                SignalEvent::new(&previous.id, SignalEventKind::Removed)
            }
            _ => return false,
        };
        self.record(event);
        true
    }

    pub fn window(&self) -> &EventWindow {
        &self.window
    }

    /// Most recent events for the health snapshot.
    pub fn recent_events(&self) -> Vec<SignalEvent> {
        self.window.recent(self.activity.recent_events_limit)
    }

    /// Tension over the live signal snapshot.
    pub fn tension(&self, signals: &[Signal]) -> TensionSnapshot {
        compute_tension(signals, &self.tension)
    }

    /// Activity over the full live signal snapshot (not just the window).
    pub fn activity_summary(&self, signals: &[Signal]) -> ActivitySummary {
        compute_activity(signals, self.activity.seconds_saved_per_auto_item)
    }
}

/// Count pending/urgent/critical signals and derive the tension level.
pub fn compute_tension(signals: &[Signal], thresholds: &TensionConfig) -> TensionSnapshot {
    let mut pending_count = 0;
    let mut urgent_count = 0;
    let mut critical_count = 0;

    for signal in signals {
        if signal.status.is_pending_decision() {
            pending_count += 1;
        }
        match signal.urgency {
            Urgency::Urgent => urgent_count += 1,
            Urgency::Critical => critical_count += 1,
            Urgency::Normal => {}
        }
    }

    TensionSnapshot {
        level: tension_level(critical_count, urgent_count, pending_count, thresholds),
        pending_count,
        urgent_count,
        critical_count,
    }
}

/// Threshold rule shared by tension and health.
pub fn tension_level(
    critical_count: usize,
    urgent_count: usize,
    pending_count: usize,
    thresholds: &TensionConfig,
) -> HealthLevel {
    if critical_count > 0 {
        HealthLevel::Critical
    } else if urgent_count > thresholds.elevated_urgent_threshold
        || pending_count > thresholds.elevated_pending_threshold
    {
        HealthLevel::Elevated
    } else {
        HealthLevel::Stable
    }
}

/// Activity figures over a signal set.
pub fn compute_activity(signals: &[Signal], seconds_per_auto_item: u64) -> ActivitySummary {
    let auto_resolved = signals
        .iter()
        .filter(|s| s.status == SignalStatus::AutoApproved)
        .count();
    let approved = signals
        .iter()
        .filter(|s| s.status == SignalStatus::Approved)
        .count();
    let escalated = signals.iter().filter(|s| s.is_escalated()).count();
    let time_saved_seconds = (auto_resolved as u64).saturating_mul(seconds_per_auto_item);

    ActivitySummary {
        total: signals.len(),
        auto_resolved,
        approved,
        escalated,
        time_saved_seconds,
        time_saved_label: format_duration(time_saved_seconds),
    }
}

/// "45s", "12m", "1h 5m"
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalType;

    fn sig(id: &str, status: SignalStatus, urgency: Urgency) -> Signal {
        Signal {
            status,
            urgency,
            ..Signal::new(id, SignalType::Purchase)
        }
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = EventWindow::new(3);
        for i in 0..5 {
            window.push(SignalEvent::new(format!("s{i}"), SignalEventKind::Created));
        }
        let ids: Vec<&str> = window.iter().map(|e| e.signal_id.as_str()).collect();
        assert_eq!(ids, vec!["s4", "s3", "s2"]);
    }

    #[test]
    fn test_zero_capacity_window_keeps_latest() {
        let mut window = EventWindow::new(0);
        window.push(SignalEvent::new("a", SignalEventKind::Created));
        window.push(SignalEvent::new("b", SignalEventKind::Created));
        assert_eq!(window.len(), 1);
        assert_eq!(window.recent(5)[0].signal_id, "b");
    }

    #[test]
    fn test_pending_threshold_is_exclusive() {
        let thresholds = TensionConfig::default();
        let signals: Vec<Signal> = (0..10)
            .map(|i| sig(&format!("p{i}"), SignalStatus::Pending, Urgency::Normal))
            .collect();
        assert_eq!(compute_tension(&signals, &thresholds).level, HealthLevel::Stable);

        let mut signals = signals;
        signals.push(sig("p10", SignalStatus::NeedsClarity, Urgency::Normal));
        let tension = compute_tension(&signals, &thresholds);
        assert_eq!(tension.pending_count, 11);
        assert_eq!(tension.level, HealthLevel::Elevated);
    }

    #[test]
    fn test_activity_summary_counts() {
        let mut flagged = sig("f", SignalStatus::Pending, Urgency::Normal);
        flagged.flag_reason = Some("vendor not on list".to_string());
        let mut incident = sig("i", SignalStatus::InMotion, Urgency::Urgent);
        incident.signal_type = SignalType::Incident;
        let signals = vec![
            sig("a1", SignalStatus::AutoApproved, Urgency::Normal),
            sig("a2", SignalStatus::AutoApproved, Urgency::Normal),
            sig("ap", SignalStatus::Approved, Urgency::Normal),
            flagged,
            incident,
        ];
        let summary = compute_activity(&signals, 180);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.auto_resolved, 2);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.escalated, 2);
        assert_eq!(summary.time_saved_seconds, 360);
        assert_eq!(summary.time_saved_label, "6m");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(3900), "1h 5m");
    }

    #[test]
    fn test_record_outcome_detects_status_change() {
        let mut aggregator = TensionAggregator::default();
        let previous = sig("x", SignalStatus::Pending, Urgency::Normal);
        let current = sig("x", SignalStatus::Approved, Urgency::Normal);
        assert!(aggregator.record_outcome(Some(&current), &ChangeOutcome::Updated { previous }));
        assert!(!aggregator.record_outcome(None, &ChangeOutcome::DuplicateInsert));

        let events = aggregator.recent_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            SignalEventKind::StatusChanged {
                from: SignalStatus::Pending,
                to: SignalStatus::Approved
            }
        );
    }
}
