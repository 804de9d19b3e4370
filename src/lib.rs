//! Pulseboard: live operational signal board
//!
//! Keeps a local, continuously reconciled view of operational signals and
//! maintenance tickets, and derives the presentation-facing projections from
//! it.
//!
//! ## Architecture
//!
//! - **Store**: applies INSERT/UPDATE/DELETE notifications to newest-first collections
//! - **Classification**: decision type, risk level, due label and workflow stage per signal
//! - **Pulse**: maps statuses onto the five pipeline states
//! - **Aggregator**: rolling event window plus tension and activity figures
//! - **Health**: one snapshot composed from all of the above, with change events
//! - **Sync**: backend abstraction, the reconciliation loop and the command client

pub mod aggregator;
pub mod classification;
pub mod config;
pub mod health;
pub mod pulse;
pub mod store;
pub mod sync;
pub mod types;

// Re-export configuration
pub use config::PulseConfig;

// Re-export commonly used types
pub use types::{
    ChangeEvent, ChangeType, ClassifiedSignal, DecisionType, EntityKind, GroupedSignals,
    HealthLevel, HealthSnapshot, MaintenanceTicket, PulseCounts, PulseState, RiskLevel, Signal,
    SignalEvent, SignalStatus, SignalType, Urgency, WorkflowStage,
};

// Re-export core components
pub use aggregator::{EventWindow, TensionAggregator};
pub use classification::{classify_and_group, classify_signal, get_workflow_stage, Classifier};
pub use health::{HealthFacade, HealthMonitor};
pub use pulse::{group_by_pulse_state, status_to_pulse_state};
pub use store::{ChangeOutcome, EntityStore};

// Re-export sync surface
pub use sync::{
    Dashboard, DashboardClient, MemoryBackend, ReplayBackend, SignalBackend, SyncLoop, SyncStats,
    TransportError,
};
