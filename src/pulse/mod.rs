//! Pipeline State Mapper
//!
//! Maps raw status to one of five pulse states and groups signal collections
//! by state. Grouping is stable: members keep their input order, and every
//! state is present in the output even when empty.

use std::collections::BTreeMap;

use crate::types::{PulseCounts, PulseState, Signal, SignalStatus};

/// Signals grouped by pulse state, iterated in pipeline order.
pub type PulseGroups = BTreeMap<PulseState, Vec<Signal>>;

/// Map a raw status to its pulse state. Statuses outside the table fall
/// back to `NeedsAction`.
pub fn status_to_pulse_state(status: &SignalStatus) -> PulseState {
    match status {
        SignalStatus::Pending => PulseState::NeedsAction,
        SignalStatus::NeedsClarity => PulseState::Blocked,
        SignalStatus::AwaitingSupplier => PulseState::Blocked,
        SignalStatus::Approved => PulseState::InMotion,
        SignalStatus::InMotion => PulseState::InMotion,
        SignalStatus::AutoApproved => PulseState::AutoHandled,
        SignalStatus::Delivered => PulseState::Resolved,
        SignalStatus::Closed => PulseState::Resolved,
        SignalStatus::Rejected => PulseState::Resolved,
        SignalStatus::Other(_) => PulseState::NeedsAction,
    }
}

/// Group signals by pulse state, preserving relative input order.
pub fn group_by_pulse_state(signals: &[Signal]) -> PulseGroups {
    let mut groups: PulseGroups = PulseState::ALL
        .iter()
        .map(|state| (*state, Vec::new()))
        .collect();

    for signal in signals {
        groups
            .entry(status_to_pulse_state(&signal.status))
            .or_default()
            .push(signal.clone());
    }

    groups
}

/// Count signals per pulse state without cloning them.
pub fn count_by_pulse_state(signals: &[Signal]) -> PulseCounts {
    signals.iter().fold(PulseCounts::default(), |mut counts, s| {
        counts.increment(status_to_pulse_state(&s.status));
        counts
    })
}
