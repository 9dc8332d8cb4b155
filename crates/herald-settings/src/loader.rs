//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HeraldSettings::default()`]
//! 2. If `~/.herald/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `HERALD_*` environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{DeliveryMode, HeraldSettings, MAX_QUEUE_CAPACITY};

/// Env var selecting `sequential` or `concurrent` delivery.
pub const ENV_DELIVERY_MODE: &str = "HERALD_DELIVERY_MODE";
/// Env var overriding the per-connection queue capacity.
pub const ENV_QUEUE_CAPACITY: &str = "HERALD_QUEUE_CAPACITY";
/// Env var overriding the default log filter.
pub const ENV_LOG_LEVEL: &str = "HERALD_LOG_LEVEL";

/// Resolve the path to the settings file (`~/.herald/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".herald").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HeraldSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<HeraldSettings> {
    let defaults = serde_json::to_value(HeraldSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: HeraldSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `HERALD_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut HeraldSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup. Invalid values are ignored.
pub fn apply_overrides_from(
    settings: &mut HeraldSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(val) = read(ENV_DELIVERY_MODE) {
        if let Some(mode) = DeliveryMode::parse(&val) {
            settings.fanout.delivery_mode = mode;
        } else {
            tracing::warn!(key = ENV_DELIVERY_MODE, value = %val, "invalid delivery mode, ignoring");
        }
    }
    if let Some(val) = read(ENV_QUEUE_CAPACITY) {
        if let Some(cap) = parse_usize_range(&val, 1, MAX_QUEUE_CAPACITY) {
            settings.fanout.connection_queue_capacity = cap;
        } else {
            tracing::warn!(key = ENV_QUEUE_CAPACITY, value = %val, "invalid queue capacity, ignoring");
        }
    }
    if let Some(val) = read(ENV_LOG_LEVEL) {
        settings.logging.level = val;
    }
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
