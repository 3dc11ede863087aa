use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{AppError, Result, services::video::Settings};

/// Video bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BridgeConfig {
    /// Interval between `timeUpdated` events while a player is open, in milliseconds.
    pub time_update_interval_ms: u64,

    /// Delay before a player-item change triggers a key-window search, in milliseconds.
    pub item_debounce_ms: u64,

    /// Whether the native bridge runs at all. When disabled every command
    /// fails as unsupported.
    pub enabled: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            time_update_interval_ms: 500,
            item_debounce_ms: 100,
            enabled: true,
        }
    }
}

impl BridgeConfig {
    /// Converts the configured timings into bridge settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidConfigField` when the update interval is zero.
    pub fn settings(&self) -> Result<Settings> {
        if self.time_update_interval_ms == 0 {
            return Err(AppError::InvalidConfigField {
                field: "bridge.time_update_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Settings {
            time_update_interval: Duration::from_millis(self.time_update_interval_ms),
            item_debounce: Duration::from_millis(self.item_debounce_ms),
        })
    }
}
