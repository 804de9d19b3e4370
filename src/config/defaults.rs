//! System-wide default constants.
//!
//! Every tunable in [`super::PulseConfig`] defaults to one of these values, so
//! behavior is unchanged when no config file is present.

// ============================================================================
// Classification
// ============================================================================

/// Confidence scores strictly below this force exception handling.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 60.0;

/// Amounts strictly above this are high risk.
pub const HIGH_RISK_AMOUNT: f64 = 250.0;

/// Amounts strictly above this (and not high) are medium risk.
pub const MEDIUM_RISK_AMOUNT: f64 = 100.0;

// ============================================================================
// Tension
// ============================================================================

/// More urgent signals than this raise tension to elevated.
pub const ELEVATED_URGENT_THRESHOLD: usize = 2;

/// More pending decisions than this raise tension to elevated.
pub const ELEVATED_PENDING_THRESHOLD: usize = 10;

// ============================================================================
// Activity
// ============================================================================

/// Estimated manual handling time saved per auto-approved signal (seconds).
pub const SECONDS_SAVED_PER_AUTO_ITEM: u64 = 180;

/// Rolling event window capacity (events).
pub const EVENT_WINDOW_CAPACITY: usize = 20;

/// Events exposed in a health snapshot.
pub const RECENT_EVENTS_LIMIT: usize = 10;

// ============================================================================
// Health
// ============================================================================

/// Buffered health-change notifications per subscriber before lagging.
pub const HEALTH_CHANGE_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Sync
// ============================================================================

/// Buffered raw notifications per subscription.
pub const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 256;
