//! Signal entity: the unit of operational work flowing through the board

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Signal Type
// ============================================================================

/// Business category of a signal.
///
/// Deserializes from any string; values outside the known set are kept in
/// `Other` so downstream lookups stay total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalType {
    Purchase,
    Maintenance,
    Incident,
    ShiftHandover,
    Compliance,
    Event,
    Resource,
    #[default]
    General,
    Other(String),
}

impl SignalType {
    /// Wire representation (kebab-case)
    pub fn as_str(&self) -> &str {
        match self {
            SignalType::Purchase => "purchase",
            SignalType::Maintenance => "maintenance",
            SignalType::Incident => "incident",
            SignalType::ShiftHandover => "shift-handover",
            SignalType::Compliance => "compliance",
            SignalType::Event => "event",
            SignalType::Resource => "resource",
            SignalType::General => "general",
            SignalType::Other(raw) => raw.as_str(),
        }
    }

    /// Incidents and shift handovers always route to the alert bucket.
    pub fn is_alerting(&self) -> bool {
        matches!(self, SignalType::Incident | SignalType::ShiftHandover)
    }
}

impl From<&str> for SignalType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "purchase" => SignalType::Purchase,
            "maintenance" => SignalType::Maintenance,
            "incident" => SignalType::Incident,
            "shift-handover" | "shift_handover" => SignalType::ShiftHandover,
            "compliance" => SignalType::Compliance,
            "event" => SignalType::Event,
            "resource" => SignalType::Resource,
            "general" => SignalType::General,
            _ => SignalType::Other(s.to_string()),
        }
    }
}

impl From<String> for SignalType {
    fn from(s: String) -> Self {
        SignalType::from(s.as_str())
    }
}

impl From<SignalType> for String {
    fn from(t: SignalType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Signal Status
// ============================================================================

/// Raw lifecycle status reported by the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalStatus {
    #[default]
    Pending,
    NeedsClarity,
    Approved,
    AutoApproved,
    InMotion,
    AwaitingSupplier,
    Delivered,
    Closed,
    Rejected,
    Other(String),
}

impl SignalStatus {
    /// Wire representation (kebab-case)
    pub fn as_str(&self) -> &str {
        match self {
            SignalStatus::Pending => "pending",
            SignalStatus::NeedsClarity => "needs-clarity",
            SignalStatus::Approved => "approved",
            SignalStatus::AutoApproved => "auto-approved",
            SignalStatus::InMotion => "in-motion",
            SignalStatus::AwaitingSupplier => "awaiting-supplier",
            SignalStatus::Delivered => "delivered",
            SignalStatus::Closed => "closed",
            SignalStatus::Rejected => "rejected",
            SignalStatus::Other(raw) => raw.as_str(),
        }
    }

    /// Statuses still waiting on a human decision.
    pub fn is_pending_decision(&self) -> bool {
        matches!(self, SignalStatus::Pending | SignalStatus::NeedsClarity)
    }
}

impl From<&str> for SignalStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => SignalStatus::Pending,
            "needs-clarity" | "needs_clarity" => SignalStatus::NeedsClarity,
            "approved" => SignalStatus::Approved,
            "auto-approved" | "auto_approved" => SignalStatus::AutoApproved,
            "in-motion" | "in_motion" => SignalStatus::InMotion,
            "awaiting-supplier" | "awaiting_supplier" => SignalStatus::AwaitingSupplier,
            "delivered" => SignalStatus::Delivered,
            "closed" => SignalStatus::Closed,
            "rejected" => SignalStatus::Rejected,
            _ => SignalStatus::Other(s.to_string()),
        }
    }
}

impl From<String> for SignalStatus {
    fn from(s: String) -> Self {
        SignalStatus::from(s.as_str())
    }
}

impl From<SignalStatus> for String {
    fn from(s: SignalStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Urgency
// ============================================================================

/// Urgency flag on a signal or ticket. Missing or unknown values are `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
            Urgency::Critical => "critical",
        }
    }
}

impl From<String> for Urgency {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "urgent" => Urgency::Urgent,
            "critical" => Urgency::Critical,
            _ => Urgency::Normal,
        }
    }
}

impl From<Urgency> for String {
    fn from(u: Urgency) -> Self {
        u.as_str().to_string()
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Signal
// ============================================================================

/// A unit of work requiring attention, as confirmed by the source of truth.
///
/// Derived fields (decision type, risk, due label, pipeline state) are never
/// stored here; see [`crate::classification`] and [`crate::pulse`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Signal {
    /// Stable identifier across updates
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub signal_type: SignalType,

    #[serde(default)]
    pub status: SignalStatus,

    /// Absent urgency is treated as normal
    #[serde(default, deserialize_with = "nullable_urgency")]
    pub urgency: Urgency,

    /// Confidence score in [0, 100]; low values force exception handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Presence forces exception classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,

    /// Truthy forces alert classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// Free-form date string from the submitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// Minimal signal with the given id and type; everything else defaulted.
    pub fn new(id: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            id: id.into(),
            signal_type,
            ..Default::default()
        }
    }

    /// Any non-empty flag reason counts, whitespace included.
    pub fn is_flagged(&self) -> bool {
        self.flag_reason.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub fn is_bottleneck(&self) -> bool {
        self.bottleneck.unwrap_or(false)
    }

    /// Incidents and flagged signals count as escalations in the activity summary.
    pub fn is_escalated(&self) -> bool {
        self.signal_type == SignalType::Incident || self.is_flagged()
    }
}

/// Partial field set for an update command.
///
/// Only fields that are `Some` are sent to the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SignalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl SignalPatch {
    /// Apply the set fields onto a signal.
    pub fn apply_to(&self, signal: &mut Signal) {
        if let Some(ref status) = self.status {
            signal.status = status.clone();
        }
        if let Some(urgency) = self.urgency {
            signal.urgency = urgency;
        }
        if self.confidence.is_some() {
            signal.confidence = self.confidence;
        }
        if self.flag_reason.is_some() {
            signal.flag_reason = self.flag_reason.clone();
        }
        if self.bottleneck.is_some() {
            signal.bottleneck = self.bottleneck;
        }
        if self.amount.is_some() {
            signal.amount = self.amount;
        }
        if self.expected_date.is_some() {
            signal.expected_date = self.expected_date.clone();
        }
        if self.title.is_some() {
            signal.title = self.title.clone();
        }
        if self.location.is_some() {
            signal.location = self.location.clone();
        }
    }
}

/// Ids arrive as strings or integers depending on the backing table.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// String-or-number id; `null` reads as empty and is rejected downstream.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        other => id_from_value(&other)
            .ok_or_else(|| D::Error::custom(format!("id must be a string or number, got {other}"))),
    }
}

fn nullable_urgency<'de, D>(deserializer: D) -> Result<Urgency, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(Urgency::from).unwrap_or_default())
}
