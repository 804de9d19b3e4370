//! Health Tests
//!
//! Tension thresholds, the bounded event window and the health snapshot as
//! seen through the dashboard.

use pulseboard::aggregator::{compute_tension, TensionAggregator};
use pulseboard::config::{ActivityConfig, PulseConfig, TensionConfig};
use pulseboard::health::HealthFacade;
use pulseboard::sync::Dashboard;
use pulseboard::types::{
    ChangeEvent, HealthLevel, MaintenanceTicket, Signal, SignalEvent, SignalEventKind,
    SignalStatus, SignalType, Urgency,
};

fn signal(id: &str, status: SignalStatus, urgency: Urgency) -> Signal {
    Signal {
        status,
        urgency,
        ..Signal::new(id, SignalType::Maintenance)
    }
}

fn board(urgent: usize, pending: usize, critical: usize) -> Vec<Signal> {
    let mut signals = Vec::new();
    for i in 0..urgent {
        signals.push(signal(&format!("u{i}"), SignalStatus::InMotion, Urgency::Urgent));
    }
    for i in 0..pending {
        signals.push(signal(&format!("p{i}"), SignalStatus::Pending, Urgency::Normal));
    }
    for i in 0..critical {
        signals.push(signal(&format!("c{i}"), SignalStatus::InMotion, Urgency::Critical));
    }
    signals
}

// ============================================================================
// Tension
// ============================================================================

#[test]
fn three_urgent_five_pending_is_elevated() {
    let tension = compute_tension(&board(3, 5, 0), &TensionConfig::default());
    assert_eq!(tension.level, HealthLevel::Elevated);
    assert_eq!(tension.urgent_count, 3);
    assert_eq!(tension.pending_count, 5);
}

#[test]
fn any_critical_signal_is_critical() {
    let tension = compute_tension(&board(0, 0, 1), &TensionConfig::default());
    assert_eq!(tension.level, HealthLevel::Critical);
}

#[test]
fn one_urgent_two_pending_is_stable() {
    let tension = compute_tension(&board(1, 2, 0), &TensionConfig::default());
    assert_eq!(tension.level, HealthLevel::Stable);
}

#[test]
fn empty_board_is_stable() {
    let tension = compute_tension(&[], &TensionConfig::default());
    assert_eq!(tension.level, HealthLevel::Stable);
    assert_eq!(tension.pending_count + tension.urgent_count + tension.critical_count, 0);
}

#[test]
fn unknown_urgency_strings_do_not_raise_tension() {
    let signals: Vec<Signal> = (0..3)
        .map(|i| {
            serde_json::from_value(serde_json::json!({
                "id": format!("h{i}"),
                "status": "in-motion",
                "urgency": "high"
            }))
            .unwrap()
        })
        .collect();
    let tension = compute_tension(&signals, &TensionConfig::default());
    assert_eq!(tension.urgent_count, 0);
    assert_eq!(tension.level, HealthLevel::Stable);
}

#[test]
fn two_urgent_is_still_stable() {
    let tension = compute_tension(&board(2, 0, 0), &TensionConfig::default());
    assert_eq!(tension.level, HealthLevel::Stable);
}

// ============================================================================
// Event window
// ============================================================================

#[test]
fn window_keeps_twenty_most_recent_of_twenty_five() {
    let mut aggregator = TensionAggregator::default();
    for i in 0..25 {
        aggregator.record(SignalEvent::new(format!("s{i}"), SignalEventKind::Created));
    }

    let window = aggregator.window();
    assert_eq!(window.len(), 20);
    let ids: Vec<&str> = window.iter().map(|e| e.signal_id.as_str()).collect();
    assert_eq!(ids.first(), Some(&"s24"));
    assert_eq!(ids.last(), Some(&"s5"));

    assert_eq!(aggregator.recent_events().len(), 10);
}

#[test]
fn window_capacity_follows_config() {
    let aggregator = TensionAggregator::new(
        TensionConfig::default(),
        ActivityConfig {
            event_window_capacity: 5,
            recent_events_limit: 3,
            ..ActivityConfig::default()
        },
    );
    assert_eq!(aggregator.window().capacity(), 5);
}

// ============================================================================
// Snapshot
// ============================================================================

#[test]
fn snapshot_reflects_current_inputs_without_caching() {
    let facade = HealthFacade::default();
    let aggregator = TensionAggregator::default();

    let mut signals = board(0, 1, 0);
    assert_eq!(
        facade.snapshot(&signals, &[], &aggregator).health_level,
        HealthLevel::Stable
    );

    signals.push(signal("late", SignalStatus::Pending, Urgency::Critical));
    let snapshot = facade.snapshot(&signals, &[], &aggregator);
    assert_eq!(snapshot.health_level, HealthLevel::Critical);
    assert_eq!(snapshot.pending_decisions, 2);
    assert_eq!(snapshot.pipeline.total(), 2);
}

#[test]
fn activity_summary_reports_time_saved() {
    let signals = vec![
        signal("a", SignalStatus::AutoApproved, Urgency::Normal),
        signal("b", SignalStatus::AutoApproved, Urgency::Normal),
        signal("c", SignalStatus::AutoApproved, Urgency::Normal),
        signal("d", SignalStatus::Approved, Urgency::Normal),
    ];
    let snapshot =
        HealthFacade::default().snapshot(&signals, &[], &TensionAggregator::default());
    let activity = snapshot.activity_summary;
    assert_eq!(activity.auto_resolved, 3);
    assert_eq!(activity.approved, 1);
    assert_eq!(activity.time_saved_seconds, 540);
    assert_eq!(activity.time_saved_label, "9m");
}

#[test]
fn dashboard_health_tracks_applied_changes() {
    let mut dashboard = Dashboard::new(&PulseConfig::default());
    dashboard.load_signals(board(0, 2, 0));
    dashboard.load_tickets(vec![MaintenanceTicket::new("t1", "Leaking roof")]);
    assert_eq!(dashboard.health().health_level, HealthLevel::Stable);

    for i in 0..3 {
        dashboard.apply_signal_change(ChangeEvent::Insert(signal(
            &format!("hot{i}"),
            SignalStatus::InMotion,
            Urgency::Urgent,
        )));
    }
    let health = dashboard.health();
    assert_eq!(health.health_level, HealthLevel::Elevated);
    assert_eq!(health.recent_events.len(), 3);
    assert_eq!(health.open_tickets, 1);

    dashboard.apply_signal_change(ChangeEvent::Update(signal(
        "hot0",
        SignalStatus::Delivered,
        Urgency::Normal,
    )));
    let health = dashboard.health();
    assert_eq!(health.health_level, HealthLevel::Stable);
    assert!(matches!(
        health.recent_events[0].kind,
        SignalEventKind::StatusChanged { .. }
    ));
}

#[test]
fn health_change_events_are_broadcast() {
    let mut dashboard = Dashboard::default();
    let mut rx = dashboard.subscribe_health();
    dashboard.load_signals(Vec::new());

    for i in 0..11 {
        dashboard.apply_signal_change(ChangeEvent::Insert(signal(
            &format!("p{i}"),
            SignalStatus::Pending,
            Urgency::Normal,
        )));
    }

    let change = rx.try_recv().unwrap();
    assert_eq!(change.from, HealthLevel::Stable);
    assert_eq!(change.to, HealthLevel::Elevated);
    assert_eq!(change.to.css_class(), "health-elevated");
    assert!(rx.try_recv().is_err());
}
