//! Replay backend
//!
//! Serves a recorded snapshot and replays a recorded notification stream,
//! one JSON envelope per line:
//!
//! ```text
//! {"kind": "signals", "eventType": "UPDATE", "new": {"id": "s1", "status": "approved"}}
//! {"kind": "tickets", "eventType": "DELETE", "old": {"id": "t4"}}
//! ```
//!
//! `kind` defaults to `signals` when absent. Lines that are not JSON are
//! skipped with a warning; envelopes are otherwise passed through untouched
//! so the dashboard's own decoding decides what is malformed.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{SignalBackend, Subscription, SubscriptionHandle, TransportError};
use crate::config::defaults::SUBSCRIPTION_CHANNEL_CAPACITY;
use crate::types::EntityKind;

/// Read-only backend over recorded data.
pub struct ReplayBackend {
    signals: Vec<Value>,
    tickets: Vec<Value>,
    notifications: Vec<(EntityKind, Value)>,
    delay_ms: u64,
    next_subscription: AtomicU64,
}

impl ReplayBackend {
    pub fn new(signals: Vec<Value>, tickets: Vec<Value>, notifications: Vec<(EntityKind, Value)>) -> Self {
        Self {
            signals,
            tickets,
            notifications,
            delay_ms: 0,
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Pace the replay with a fixed delay between notifications.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

#[async_trait]
impl SignalBackend for ReplayBackend {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, TransportError> {
        Ok(match kind {
            EntityKind::Signals => self.signals.clone(),
            EntityKind::Tickets => self.tickets.clone(),
        })
    }

    /// Each subscription gets its own replay of the matching lines; the feed
    /// closes once the recording is exhausted.
    async fn subscribe(&self, kind: EntityKind) -> Result<Subscription, TransportError> {
        let (tx, receiver) = mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        let envelopes: Vec<Value> = self
            .notifications
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, envelope)| envelope.clone())
            .collect();
        let delay_ms = self.delay_ms;

        debug!(kind = %kind, count = envelopes.len(), "Starting replay feed");
        tokio::spawn(async move {
            for (i, envelope) in envelopes.into_iter().enumerate() {
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                }
                if tx.send(envelope).await.is_err() {
                    debug!(kind = %kind, "Replay feed receiver dropped");
                    return;
                }
            }
        });

        Ok(Subscription {
            handle: SubscriptionHandle { id, kind },
            receiver,
        })
    }

    async fn unsubscribe(&self, _handle: SubscriptionHandle) -> Result<(), TransportError> {
        Ok(())
    }

    async fn insert(&self, _kind: EntityKind, _entity: Value) -> Result<Value, TransportError> {
        Err(TransportError::Rejected("replay backend is read-only".to_string()))
    }

    async fn update(&self, _kind: EntityKind, _id: &str, _fields: Value) -> Result<Value, TransportError> {
        Err(TransportError::Rejected("replay backend is read-only".to_string()))
    }

    fn backend_name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Recording parsers
// ============================================================================

/// Parse a JSONL notification recording. Non-JSON lines are skipped.
pub fn parse_notification_lines(contents: &str) -> Vec<(EntityKind, Value)> {
    let mut parsed = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut envelope: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Skipping unparseable notification line");
                continue;
            }
        };

        let kind = match envelope.as_object_mut().and_then(|obj| obj.remove("kind")) {
            None => EntityKind::Signals,
            Some(tag) => match serde_json::from_value::<EntityKind>(tag) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "Skipping notification with unknown kind");
                    continue;
                }
            },
        };
        parsed.push((kind, envelope));
    }
    parsed
}

/// Parse a snapshot: either a JSON array of rows or JSONL, one row per line.
pub fn parse_snapshot(contents: &str) -> anyhow::Result<Vec<Value>> {
    let trimmed = contents.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).map_err(anyhow::Error::from))
        .collect()
}

/// Load a snapshot file.
pub fn load_snapshot_file(path: &Path) -> anyhow::Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read snapshot {}: {}", path.display(), e))?;
    let rows = parse_snapshot(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse snapshot {}: {}", path.display(), e))?;
    info!(path = %path.display(), rows = rows.len(), "Loaded snapshot");
    Ok(rows)
}
