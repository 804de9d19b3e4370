//! Classification Engine
//!
//! Deterministic, rule-based routing of signals into decision buckets with a
//! risk level and due label. Every function here is total: unknown types and
//! statuses resolve through explicit fallbacks, never errors.
//!
//! ## Decision Precedence
//!
//! Rules run in a fixed order and later rules win:
//!
//! 1. Default: approval
//! 2. Compliance type, a flag reason, or low confidence: exception
//! 3. Incident or shift-handover type, or a bottleneck: alert
//!
//! A signal can therefore only end in one bucket.

use crate::config::{self, ClassificationConfig};
use crate::types::{
    ClassifiedSignal, DecisionType, GroupedSignals, RiskLevel, Signal, SignalStatus, SignalType,
    Urgency, WorkflowStage,
};

/// Steps in the approval workflow.
pub const WORKFLOW_TOTAL_STAGES: u8 = 4;

/// Classifier bound to a set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    thresholds: ClassificationConfig,
}

impl Classifier {
    pub fn new(thresholds: ClassificationConfig) -> Self {
        Self { thresholds }
    }

    /// Classifier using the process-wide configuration.
    pub fn from_global() -> Self {
        Self::new(config::get().classification.clone())
    }

    pub fn thresholds(&self) -> &ClassificationConfig {
        &self.thresholds
    }

    /// Classify one signal. Reads only the entity fields, so classifying the
    /// stripped output again yields the same result.
    pub fn classify(&self, signal: &Signal) -> ClassifiedSignal {
        ClassifiedSignal {
            decision_type: self.decision_type(signal),
            risk_level: self.risk_level(signal),
            due_label: due_label(signal),
            signal: signal.clone(),
        }
    }

    /// Classify every signal and partition into approvals, exceptions and
    /// alerts. `all` keeps every classified signal in input order.
    pub fn classify_and_group(&self, signals: &[Signal]) -> GroupedSignals {
        let mut grouped = GroupedSignals {
            all: Vec::with_capacity(signals.len()),
            ..Default::default()
        };

        for signal in signals {
            let classified = self.classify(signal);
            match classified.decision_type {
                DecisionType::Approval => grouped.approvals.push(classified.clone()),
                DecisionType::Exception => grouped.exceptions.push(classified.clone()),
                DecisionType::Alert => grouped.alerts.push(classified.clone()),
            }
            grouped.all.push(classified);
        }

        tracing::trace!(
            total = grouped.all.len(),
            approvals = grouped.approvals.len(),
            exceptions = grouped.exceptions.len(),
            alerts = grouped.alerts.len(),
            "Signals classified"
        );

        grouped
    }

    pub fn decision_type(&self, signal: &Signal) -> DecisionType {
        let mut decision = DecisionType::Approval;

        let low_confidence = signal
            .confidence
            .is_some_and(|c| c < self.thresholds.low_confidence_threshold);
        if signal.signal_type == SignalType::Compliance || signal.is_flagged() || low_confidence {
            decision = DecisionType::Exception;
        }

        // Alert overrides exception
        if signal.signal_type.is_alerting() || signal.is_bottleneck() {
            decision = DecisionType::Alert;
        }

        decision
    }

    pub fn risk_level(&self, signal: &Signal) -> RiskLevel {
        let amount = signal.amount.filter(|a| a.is_finite());
        let above = |limit: f64| amount.is_some_and(|a| a > limit);

        if signal.urgency == Urgency::Critical || above(self.thresholds.high_risk_amount) {
            RiskLevel::High
        } else if signal.urgency == Urgency::Urgent || above(self.thresholds.medium_risk_amount) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// `"Overdue"` for critical signals, otherwise `"Due: <date>"` when an
/// expected date is set.
pub fn due_label(signal: &Signal) -> Option<String> {
    if signal.urgency == Urgency::Critical {
        return Some("Overdue".to_string());
    }
    signal
        .expected_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| format!("Due: {d}"))
}

/// Classify one signal with the process-wide thresholds.
pub fn classify_signal(signal: &Signal) -> ClassifiedSignal {
    Classifier::from_global().classify(signal)
}

/// Classify and partition with the process-wide thresholds.
pub fn classify_and_group(signals: &[Signal]) -> GroupedSignals {
    Classifier::from_global().classify_and_group(signals)
}

/// Map a status to its workflow stage. Unknown statuses sit at stage 1 with
/// the raw status as label.
pub fn get_workflow_stage(status: &SignalStatus) -> WorkflowStage {
    let (stage, label) = match status {
        SignalStatus::Pending => (1, "Submitted"),
        SignalStatus::NeedsClarity => (1, "Needs Clarity"),
        SignalStatus::Approved => (2, "Approved"),
        SignalStatus::AutoApproved => (2, "Auto-Approved"),
        SignalStatus::InMotion => (3, "In Motion"),
        SignalStatus::AwaitingSupplier => (3, "Awaiting Supplier"),
        SignalStatus::Delivered => (4, "Delivered"),
        SignalStatus::Closed => (4, "Closed"),
        SignalStatus::Rejected => (4, "Rejected"),
        SignalStatus::Other(raw) => {
            return WorkflowStage {
                stage: 1,
                total: WORKFLOW_TOTAL_STAGES,
                label: raw.clone(),
            }
        }
    };

    WorkflowStage {
        stage,
        total: WORKFLOW_TOTAL_STAGES,
        label: label.to_string(),
    }
}
