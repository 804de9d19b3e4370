//! Live synchronization with the source of truth
//!
//! ```text
//! SignalBackend ──subscribe──▶ SyncLoop ──apply──▶ Arc<RwLock<Dashboard>>
//!       ▲                                              │
//!       └──────── DashboardClient (commands) ◀── UI ───┘ (reads)
//! ```
//!
//! The dashboard changes only when a notification arrives. Commands issued
//! through [`DashboardClient`] go to the backend and come back as
//! notifications like any other change.

pub mod backend;
pub mod client;
pub mod dashboard;
pub mod memory;
pub mod replay;
pub mod sync_loop;

pub use backend::{SignalBackend, Subscription, SubscriptionHandle, TransportError};
pub use client::DashboardClient;
pub use dashboard::{Dashboard, ReconcileStats};
pub use memory::MemoryBackend;
pub use replay::ReplayBackend;
pub use sync_loop::{SyncLoop, SyncStats};
