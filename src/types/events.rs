//! Change notifications and observed signal transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SignalStatus;

// ============================================================================
// Change Notifications (inbound)
// ============================================================================

/// Collections served by the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Signals,
    Tickets,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Signals => write!(f, "signals"),
            EntityKind::Tickets => write!(f, "tickets"),
        }
    }
}

/// Mutation tag carried by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl ChangeType {
    /// Parse the wire tag. Returns `None` for anything unrecognised.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_uppercase().as_str() {
            "INSERT" => Some(ChangeType::Insert),
            "UPDATE" => Some(ChangeType::Update),
            "DELETE" => Some(ChangeType::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Insert => write!(f, "INSERT"),
            ChangeType::Update => write!(f, "UPDATE"),
            ChangeType::Delete => write!(f, "DELETE"),
        }
    }
}

/// A decoded change notification for one entity.
///
/// INSERT/UPDATE carry the full new entity; DELETE carries only the old id.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    Insert(T),
    Update(T),
    Delete { id: String },
}

impl<T> ChangeEvent<T> {
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeEvent::Insert(_) => ChangeType::Insert,
            ChangeEvent::Update(_) => ChangeType::Update,
            ChangeEvent::Delete { .. } => ChangeType::Delete,
        }
    }
}

// ============================================================================
// Signal Events (rolling window)
// ============================================================================

/// What was observed about a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalEventKind {
    Created,
    Updated,
    StatusChanged { from: SignalStatus, to: SignalStatus },
    Removed,
}

impl SignalEventKind {
    /// Short code for logging
    pub fn short_code(&self) -> &'static str {
        match self {
            SignalEventKind::Created => "NEW",
            SignalEventKind::Updated => "UPD",
            SignalEventKind::StatusChanged { .. } => "STATUS",
            SignalEventKind::Removed => "DEL",
        }
    }
}

/// An observed transition, kept only in the bounded in-memory window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub signal_id: String,
    #[serde(flatten)]
    pub kind: SignalEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SignalEvent {
    pub fn new(signal_id: impl Into<String>, kind: SignalEventKind) -> Self {
        Self::at(signal_id, kind, Utc::now())
    }

    pub fn at(signal_id: impl Into<String>, kind: SignalEventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            signal_id: signal_id.into(),
            kind,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_parse_is_case_insensitive() {
        assert_eq!(ChangeType::parse("insert"), Some(ChangeType::Insert));
        assert_eq!(ChangeType::parse(" UPDATE "), Some(ChangeType::Update));
        assert_eq!(ChangeType::parse("TRUNCATE"), None);
    }

    #[test]
    fn test_status_change_serializes_with_tag() {
        let event = SignalEvent::new(
            "sig-1",
            SignalEventKind::StatusChanged {
                from: SignalStatus::Pending,
                to: SignalStatus::Approved,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "status_changed");
        assert_eq!(json["from"], "pending");
        assert_eq!(json["to"], "approved");
    }
}
