use serde_json::Value;

use super::BridgeError;

fn number(args: &Value, key: &str) -> Option<f64> {
    args.get(key)?.as_f64().filter(|n| n.is_finite())
}

/// Arguments of the `seek` command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeekOptions {
    /// Target position in seconds; `None` when missing or not a number
    pub time: Option<f64>,
}

impl SeekOptions {
    /// Seek to `seconds`.
    pub fn at(seconds: f64) -> Self {
        Self {
            time: Some(seconds),
        }
    }

    /// Decodes a JSON argument object such as `{"time": 30}`.
    pub fn from_args(args: &Value) -> Self {
        Self {
            time: number(args, "time"),
        }
    }

    pub(crate) fn target(self) -> Result<f64, BridgeError> {
        self.time
            .filter(|t| t.is_finite())
            .map(|t| t.max(0.0))
            .ok_or_else(|| BridgeError::missing_number("time"))
    }
}

/// Arguments of the `setVolume` command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeOptions {
    /// Volume level; `None` when missing or not a number
    pub volume: Option<f64>,
}

impl VolumeOptions {
    /// Set the volume to `level`.
    pub fn level(level: f64) -> Self {
        Self {
            volume: Some(level),
        }
    }

    /// Decodes a JSON argument object such as `{"volume": 0.5}`.
    pub fn from_args(args: &Value) -> Self {
        Self {
            volume: number(args, "volume"),
        }
    }

    pub(crate) fn level_checked(self) -> Result<f32, BridgeError> {
        self.volume
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0) as f32)
            .ok_or_else(|| BridgeError::missing_number("volume"))
    }
}
