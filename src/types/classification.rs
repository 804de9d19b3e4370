//! Derived classification types: decision buckets, risk, workflow stage

use serde::{Deserialize, Serialize};

use super::Signal;

/// Routing bucket for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionType {
    #[default]
    Approval,
    Exception,
    Alert,
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionType::Approval => write!(f, "approval"),
            DecisionType::Exception => write!(f, "exception"),
            DecisionType::Alert => write!(f, "alert"),
        }
    }
}

/// Risk level of a single signal, driven by urgency and amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Signal plus its derived classification.
///
/// Built fresh on every read by [`crate::classification::classify_signal`];
/// never cached across a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSignal {
    #[serde(flatten)]
    pub signal: Signal,
    pub decision_type: DecisionType,
    pub risk_level: RiskLevel,
    pub due_label: Option<String>,
}

impl ClassifiedSignal {
    /// Strip the derived fields, returning the underlying entity.
    pub fn into_signal(self) -> Signal {
        self.signal
    }

    pub fn id(&self) -> &str {
        &self.signal.id
    }
}

/// Signals partitioned by decision type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedSignals {
    pub approvals: Vec<ClassifiedSignal>,
    pub exceptions: Vec<ClassifiedSignal>,
    pub alerts: Vec<ClassifiedSignal>,
    /// Every input signal, classified, in input order
    pub all: Vec<ClassifiedSignal>,
}

/// Position of a status within the 4-step approval workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStage {
    pub stage: u8,
    pub total: u8,
    pub label: String,
}
