//! Configuration schema definitions and loading.
//!
//! Every section defaults sensibly, so an empty or partial TOML file
//! yields a working configuration.

mod bridge;
mod general;
mod loading;
mod paths;

#[cfg(test)]
mod tests;

pub use bridge::BridgeConfig;
pub use general::{GeneralConfig, LogLevel};
pub use paths::ConfigPaths;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Config {
    /// General application settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Video bridge timing and availability.
    #[serde(default)]
    pub bridge: BridgeConfig,
}
