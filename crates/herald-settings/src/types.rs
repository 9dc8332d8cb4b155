//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields take their production default.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Upper bound for a per-connection outbound queue.
pub const MAX_QUEUE_CAPACITY: usize = 1_048_576;

/// Root settings type.
///
/// ```json
/// {
///   "fanout": { "deliveryMode": "sequential", "connectionQueueCapacity": 256 },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeraldSettings {
    /// Settings schema version.
    pub version: String,
    /// Fan-out behaviour.
    pub fanout: FanoutSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for HeraldSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            fanout: FanoutSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl HeraldSettings {
    /// Reject values that would make the fan-out layer unusable.
    pub fn validate(&self) -> Result<()> {
        let cap = self.fanout.connection_queue_capacity;
        if cap == 0 || cap > MAX_QUEUE_CAPACITY {
            return Err(SettingsError::InvalidValue(format!(
                "connectionQueueCapacity must be in 1..={MAX_QUEUE_CAPACITY}, got {cap}"
            )));
        }
        Ok(())
    }
}

/// How a single fan-out call issues its sends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One send after another.
    Sequential,
    /// All sends of a recipient category polled together.
    #[default]
    Concurrent,
}

impl DeliveryMode {
    /// Parse a mode name (case-insensitive).
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "concurrent" => Some(Self::Concurrent),
            _ => None,
        }
    }
}

/// Fan-out settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FanoutSettings {
    /// Sequential or concurrent sends.
    pub delivery_mode: DeliveryMode,
    /// Capacity of each connection's outbound queue.
    pub connection_queue_capacity: usize,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            delivery_mode: DeliveryMode::Concurrent,
            connection_queue_capacity: 1024,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
