//! Tension, activity and health snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PulseCounts, SignalEvent};

/// Aggregate system level, shared by tension and health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    #[default]
    Stable,
    Elevated,
    Critical,
}

impl HealthLevel {
    /// Presentation class name for consumers that style by level.
    pub fn css_class(&self) -> &'static str {
        match self {
            HealthLevel::Stable => "health-stable",
            HealthLevel::Elevated => "health-elevated",
            HealthLevel::Critical => "health-critical",
        }
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthLevel::Stable => write!(f, "STABLE"),
            HealthLevel::Elevated => write!(f, "ELEVATED"),
            HealthLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Tension computed over the live signal set. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TensionSnapshot {
    pub level: HealthLevel,
    pub pending_count: usize,
    pub urgent_count: usize,
    pub critical_count: usize,
}

/// What the automation did across the current signal set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub total: usize,
    pub auto_resolved: usize,
    pub approved: usize,
    pub escalated: usize,
    pub time_saved_seconds: u64,
    /// Human-readable form of `time_saved_seconds` ("45s", "12m", "1h 5m")
    pub time_saved_label: String,
}

/// Everything a consumer needs to render overall health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub health_level: HealthLevel,
    pub tension_level: HealthLevel,
    pub pending_decisions: usize,
    pub critical_count: usize,
    pub urgent_count: usize,
    /// Most recent first
    pub recent_events: Vec<SignalEvent>,
    pub activity_summary: ActivitySummary,
    pub pipeline: PulseCounts,
    pub open_tickets: usize,
}

/// Emitted whenever the health level moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthChange {
    pub from: HealthLevel,
    pub to: HealthLevel,
    pub at: DateTime<Utc>,
}

impl HealthChange {
    pub fn is_escalation(&self) -> bool {
        self.to > self.from
    }
}
