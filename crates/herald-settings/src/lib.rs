//! # herald-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`HeraldSettings::default()`]
//! 2. **User file**: `~/.herald/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HERALD_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{DeliveryMode, FanoutSettings, HeraldSettings, LoggingSettings};

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<HeraldSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.herald/settings.json` with env var
/// overrides. If loading fails, the failure is logged and compiled defaults
/// are used.
pub fn get_settings() -> &'static HeraldSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            HeraldSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: HeraldSettings) -> std::result::Result<(), HeraldSettings> {
    SETTINGS.set(settings)
}
