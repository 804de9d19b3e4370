//! Sync Integration Tests
//!
//! Drives the full loop against the in-memory backend: snapshot load,
//! commands round-tripping through notifications, malformed deliveries,
//! transport failures and cancellation.

use std::sync::Arc;
use std::time::Duration;

use pulseboard::config::PulseConfig;
use pulseboard::sync::{
    Dashboard, DashboardClient, MemoryBackend, SignalBackend, SyncLoop, SyncStats, TransportError,
};
use pulseboard::types::{
    EntityKind, HealthLevel, MaintenanceTicket, Signal, SignalPatch, SignalStatus, SignalType,
    TicketPatch, Urgency,
};
use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

struct Harness {
    backend: Arc<MemoryBackend>,
    dashboard: Arc<RwLock<Dashboard>>,
    client: DashboardClient<MemoryBackend>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<SyncStats, TransportError>>,
}

async fn start(backend: MemoryBackend) -> Harness {
    let backend = Arc::new(backend);
    let dashboard = Arc::new(RwLock::new(Dashboard::new(&PulseConfig::default())));
    let cancel = CancellationToken::new();
    let sync = SyncLoop::new(Arc::clone(&backend), Arc::clone(&dashboard), cancel.clone());
    let handle = tokio::spawn(sync.run());

    // Two subscriptions means the loop is past setup.
    wait_until(|| {
        let backend = Arc::clone(&backend);
        async move { backend.subscriber_count().await == 2 }
    })
    .await;
    wait_until(|| {
        let dashboard = Arc::clone(&dashboard);
        async move { !dashboard.read().await.is_loading() }
    })
    .await;

    Harness {
        client: DashboardClient::new(Arc::clone(&backend)),
        backend,
        dashboard,
        cancel,
        handle,
    }
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

// ============================================================================
// Snapshot load
// ============================================================================

#[tokio::test]
async fn snapshot_is_loaded_before_live_updates() {
    let backend = MemoryBackend::new();
    backend
        .seed(
            EntityKind::Signals,
            vec![
                json!({ "id": "s2", "signal_type": "purchase", "created_at": "2026-10-02T08:00:00Z" }),
                json!({ "id": "s1", "signal_type": "incident", "created_at": "2026-10-01T08:00:00Z" }),
                json!("garbage row"),
            ],
        )
        .await;
    backend
        .seed(EntityKind::Tickets, vec![json!({ "id": "t1", "title": "Door" })])
        .await;

    let h = start(backend).await;
    {
        let board = h.dashboard.read().await;
        let ids: Vec<&str> = board.signals().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(board.tickets().len(), 1);
        assert!(!board.signals_loading());
        assert!(!board.tickets_loading());
    }

    h.cancel.cancel();
    let stats = h.handle.await.unwrap().unwrap();
    assert_eq!(stats.signals_loaded, 2);
    assert_eq!(stats.tickets_loaded, 1);
    assert!(stats.cancelled);
}

// ============================================================================
// Commands round-trip through notifications
// ============================================================================

#[tokio::test]
async fn add_signal_appears_only_via_notification() {
    let h = start(MemoryBackend::new()).await;

    let mut draft = Signal::new("", SignalType::Purchase);
    draft.amount = Some(320.0);
    let stored = h.client.add_signal(&draft).await.unwrap();
    assert!(!stored.id.is_empty());
    assert!(stored.created_at.is_some());

    let id = stored.id.clone();
    let dashboard = Arc::clone(&h.dashboard);
    wait_until(|| {
        let dashboard = Arc::clone(&dashboard);
        let id = id.clone();
        async move { dashboard.read().await.signal_store().contains(&id) }
    })
    .await;

    let board = h.dashboard.read().await;
    assert_eq!(board.signals().len(), 1);
    assert_eq!(board.health().recent_events.len(), 1);
    drop(board);

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn update_signal_moves_status_and_records_transition() {
    let backend = MemoryBackend::new();
    backend
        .seed(
            EntityKind::Signals,
            vec![json!({ "id": "s1", "signal_type": "purchase", "status": "pending" })],
        )
        .await;
    let h = start(backend).await;

    let patch = SignalPatch {
        status: Some(SignalStatus::Approved),
        ..SignalPatch::default()
    };
    let updated = h.client.update_signal("s1", &patch).await.unwrap();
    assert_eq!(updated.status, SignalStatus::Approved);

    let dashboard = Arc::clone(&h.dashboard);
    wait_until(|| {
        let dashboard = Arc::clone(&dashboard);
        async move {
            dashboard
                .read()
                .await
                .signal_store()
                .get("s1")
                .is_some_and(|s| s.status == SignalStatus::Approved)
        }
    })
    .await;

    let health = h.dashboard.read().await.health();
    assert_eq!(health.recent_events[0].kind.short_code(), "STATUS");
    assert_eq!(health.activity_summary.approved, 1);

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn ticket_commands_round_trip() {
    let h = start(MemoryBackend::new()).await;

    let created = h
        .client
        .create_ticket(&MaintenanceTicket::new("", "Broken boom barrier"))
        .await
        .unwrap();
    let patch = TicketPatch {
        status: Some("closed".to_string()),
        ..TicketPatch::default()
    };
    let updated = assert_ok!(h.client.update_ticket(&created.id, &patch).await);
    assert_eq!(updated.title, "Broken boom barrier");

    let dashboard = Arc::clone(&h.dashboard);
    let id = created.id.clone();
    wait_until(|| {
        let dashboard = Arc::clone(&dashboard);
        let id = id.clone();
        async move {
            dashboard
                .read()
                .await
                .ticket_store()
                .get(&id)
                .is_some_and(|t| !t.is_open())
        }
    })
    .await;
    assert_eq!(h.dashboard.read().await.health().open_tickets, 0);

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn pending_create_clears_when_notification_lands() {
    let h = start(MemoryBackend::new()).await;
    let client = h.client.clone().with_pending(Arc::clone(&h.dashboard));

    let stored = client
        .add_signal(&Signal::new("", SignalType::Incident))
        .await
        .unwrap();

    let dashboard = Arc::clone(&h.dashboard);
    wait_until(|| {
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.read().await.pending_count() == 0 }
    })
    .await;

    let board = h.dashboard.read().await;
    assert!(board.signal_store().contains(&stored.id));
    let merged: Vec<String> = board.merged_signals().into_iter().map(|s| s.id).collect();
    assert_eq!(merged, vec![stored.id.clone()]);
    drop(board);

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_pending_commands_are_dropped() {
    let backend = MemoryBackend::new();
    backend
        .seed(EntityKind::Signals, vec![json!({ "id": "s1", "status": "pending" })])
        .await;
    let h = start(backend).await;
    let client = h.client.clone().with_pending(Arc::clone(&h.dashboard));

    h.backend.set_available(false);
    assert_err!(client.add_signal(&Signal::new("", SignalType::Purchase)).await);
    let patch = SignalPatch {
        status: Some(SignalStatus::Rejected),
        ..SignalPatch::default()
    };
    assert_err!(client.update_signal("s1", &patch).await);

    let board = h.dashboard.read().await;
    assert_eq!(board.pending_count(), 0);
    assert_eq!(board.merged_signals()[0].status, SignalStatus::Pending);
    drop(board);

    h.backend.set_available(true);
    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn failed_command_leaves_store_unchanged() {
    let backend = MemoryBackend::new();
    backend
        .seed(EntityKind::Signals, vec![json!({ "id": "s1", "status": "pending" })])
        .await;
    let h = start(backend).await;

    h.backend.set_available(false);
    let err = assert_err!(
        h.client
            .add_signal(&Signal::new("", SignalType::Incident))
            .await
    );
    assert!(matches!(err, TransportError::Unavailable(_)));

    h.backend.set_available(true);
    let err = h
        .client
        .update_signal("missing", &SignalPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NotFound { .. }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let board = h.dashboard.read().await;
    assert_eq!(board.signals().len(), 1);
    assert!(board.aggregator().window().is_empty());
    drop(board);

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_and_duplicate_deliveries_are_tolerated() {
    let h = start(MemoryBackend::new()).await;

    let envelope = json!({ "eventType": "INSERT", "new": { "id": "s9", "urgency": "critical" } });
    h.backend.emit_raw(EntityKind::Signals, envelope.clone()).await;
    h.backend.emit_raw(EntityKind::Signals, envelope).await;
    h.backend
        .emit_raw(EntityKind::Signals, json!({ "eventType": "UPSERT", "new": { "id": "s10" } }))
        .await;
    h.backend
        .emit_raw(EntityKind::Signals, json!({ "eventType": "DELETE", "old": { "id": "nobody" } }))
        .await;

    let dashboard = Arc::clone(&h.dashboard);
    wait_until(|| {
        let dashboard = Arc::clone(&dashboard);
        async move {
            let stats = dashboard.read().await.stats();
            stats.applied + stats.ignored + stats.rejected == 4
        }
    })
    .await;

    let board = h.dashboard.read().await;
    assert_eq!(board.signals().len(), 1);
    assert_eq!(board.health().health_level, HealthLevel::Critical);
    let stats = board.stats();
    assert_eq!(stats.applied, 1);
    assert_eq!(stats.ignored, 2);
    assert_eq!(stats.rejected, 1);
    drop(board);

    h.cancel.cancel();
    let stats = h.handle.await.unwrap().unwrap();
    assert_eq!(stats.signal_notifications, 4);
    assert_eq!(stats.rejected, 1);
}

#[tokio::test]
async fn setup_failure_clears_loading_flags() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_available(false);
    let dashboard = Arc::new(RwLock::new(Dashboard::default()));

    let result = SyncLoop::new(Arc::clone(&backend), Arc::clone(&dashboard), CancellationToken::new())
        .run()
        .await;

    assert!(matches!(result, Err(TransportError::Unavailable(_))));
    assert!(!dashboard.read().await.is_loading());
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn cancellation_releases_subscriptions_and_stops_applying() {
    let h = start(MemoryBackend::new()).await;

    h.cancel.cancel();
    let stats = h.handle.await.unwrap().unwrap();
    assert!(stats.cancelled);
    assert_eq!(h.backend.subscriber_count().await, 0);

    // Inserts after shutdown reach the backend but not the board.
    h.client
        .add_signal(&Signal::new("late", SignalType::Purchase))
        .await
        .unwrap();
    assert_eq!(h.backend.fetch_all(EntityKind::Signals).await.unwrap().len(), 1);
    assert!(h.dashboard.read().await.signals().is_empty());
}

#[tokio::test]
async fn loop_ends_when_both_feeds_close() {
    let h = start(MemoryBackend::new()).await;

    let mut urgent = Signal::new("u1", SignalType::Maintenance);
    urgent.urgency = Urgency::Urgent;
    h.client.add_signal(&urgent).await.unwrap();
    h.backend.close_feeds().await;

    let stats = h.handle.await.unwrap().unwrap();
    assert!(!stats.cancelled);
    assert_eq!(stats.signal_notifications, 1);
    assert!(h.dashboard.read().await.signal_store().contains("u1"));
}
