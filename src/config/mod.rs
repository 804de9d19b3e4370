//! Board Configuration Module
//!
//! Tension thresholds, risk amounts and activity tuning loaded from TOML,
//! replacing presentation constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `PULSE_CONFIG` environment variable (path to TOML file)
//! 2. `pulse_config.toml` in the current working directory
//! 3. Built-in defaults ([`defaults`])
//!
//! ## Usage
//!
//! Library components take a `&PulseConfig` explicitly. Binaries may also
//! install a process-wide copy:
//!
//! ```ignore
//! config::init(PulseConfig::load());
//! let window = config::get().activity.event_window_capacity;
//! ```

mod pulse_config;
pub mod defaults;
pub mod validation;

pub use pulse_config::*;

use std::sync::OnceLock;

/// Global board configuration, initialized once at startup.
static PULSE_CONFIG: OnceLock<PulseConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored.
pub fn init(config: PulseConfig) {
    if PULSE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global configuration. Installs the built-in defaults if `init()`
/// has not been called yet.
pub fn get() -> &'static PulseConfig {
    PULSE_CONFIG.get_or_init(PulseConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    PULSE_CONFIG.get().is_some()
}
