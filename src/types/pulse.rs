//! Pipeline ("pulse") states

use serde::{Deserialize, Serialize};

/// One of the five canonical pipeline states, derived from status only.
///
/// Ordering follows the visual pipeline left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PulseState {
    #[default]
    NeedsAction,
    InMotion,
    Blocked,
    AutoHandled,
    Resolved,
}

impl PulseState {
    /// All states in pipeline order.
    pub const ALL: [PulseState; 5] = [
        PulseState::NeedsAction,
        PulseState::InMotion,
        PulseState::Blocked,
        PulseState::AutoHandled,
        PulseState::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PulseState::NeedsAction => "needs-action",
            PulseState::InMotion => "in-motion",
            PulseState::Blocked => "blocked",
            PulseState::AutoHandled => "auto-handled",
            PulseState::Resolved => "resolved",
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            PulseState::NeedsAction => "Needs Action",
            PulseState::InMotion => "In Motion",
            PulseState::Blocked => "Blocked",
            PulseState::AutoHandled => "Auto-Handled",
            PulseState::Resolved => "Resolved",
        }
    }
}

impl std::fmt::Display for PulseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of signals in each pulse state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseCounts {
    pub needs_action: usize,
    pub in_motion: usize,
    pub blocked: usize,
    pub auto_handled: usize,
    pub resolved: usize,
}

impl PulseCounts {
    pub fn increment(&mut self, state: PulseState) {
        match state {
            PulseState::NeedsAction => self.needs_action += 1,
            PulseState::InMotion => self.in_motion += 1,
            PulseState::Blocked => self.blocked += 1,
            PulseState::AutoHandled => self.auto_handled += 1,
            PulseState::Resolved => self.resolved += 1,
        }
    }

    pub fn get(&self, state: PulseState) -> usize {
        match state {
            PulseState::NeedsAction => self.needs_action,
            PulseState::InMotion => self.in_motion,
            PulseState::Blocked => self.blocked,
            PulseState::AutoHandled => self.auto_handled,
            PulseState::Resolved => self.resolved,
        }
    }

    pub fn total(&self) -> usize {
        self.needs_action + self.in_motion + self.blocked + self.auto_handled + self.resolved
    }
}
