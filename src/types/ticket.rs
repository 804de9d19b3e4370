//! Maintenance tickets: physical work orders reconciled alongside signals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Urgency;

/// Physical maintenance work item.
///
/// Follows the same reconciliation discipline as [`super::Signal`] but has no
/// classification of its own; it only feeds counts into the health snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaintenanceTicket {
    #[serde(default, deserialize_with = "super::signal::deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Free-form status string (open, in-progress, resolved, ...)
    #[serde(default = "default_ticket_status")]
    pub status: String,

    #[serde(default)]
    pub priority: Urgency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_ticket_status() -> String {
    "open".to_string()
}

impl MaintenanceTicket {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: default_ticket_status(),
            ..Default::default()
        }
    }

    /// Tickets in a terminal status no longer count as open work.
    pub fn is_open(&self) -> bool {
        !matches!(
            self.status.trim().to_lowercase().as_str(),
            "closed" | "resolved" | "delivered" | "done"
        )
    }
}

/// Partial field set for a ticket update command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TicketPatch {
    pub fn apply_to(&self, ticket: &mut MaintenanceTicket) {
        if let Some(ref status) = self.status {
            ticket.status = status.clone();
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if self.assigned_to.is_some() {
            ticket.assigned_to = self.assigned_to.clone();
        }
        if let Some(ref title) = self.title {
            ticket.title = title.clone();
        }
    }
}
