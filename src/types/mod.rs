//! Shared data structures for the signal board
//!
//! - Entities: Signal, MaintenanceTicket (owned by the entity stores)
//! - Derived: ClassifiedSignal, PulseState, TensionSnapshot, HealthSnapshot
//! - Notifications: ChangeEvent (inbound), SignalEvent (rolling window)

mod signal;
mod ticket;
mod classification;
mod pulse;
mod events;
mod health;

pub use signal::*;
pub use ticket::*;
pub use classification::*;
pub use pulse::*;
pub use events::*;
pub use health::*;
