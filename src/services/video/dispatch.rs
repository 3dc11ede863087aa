use serde_json::Value;
use tracing::debug;

use super::{BridgeError, SeekOptions, VideoBridge, VolumeOptions, events::to_json};

/// Method names accepted by [`dispatch`], including the legacy aliases.
pub const METHODS: [&str; 8] = [
    "isActive",
    "isNativePlayerActive",
    "getState",
    "getPlayerState",
    "play",
    "pause",
    "seek",
    "setVolume",
];

/// Routes a named call with JSON arguments to `bridge`.
///
/// Commands without a payload resolve to `null`.
///
/// # Errors
///
/// Returns `BridgeError::UnknownMethod` for names outside [`METHODS`], or
/// whatever the command itself rejects with.
pub async fn dispatch(
    bridge: &dyn VideoBridge,
    method: &str,
    args: &Value,
) -> Result<Value, BridgeError> {
    debug!(method, "Dispatching bridge call");

    match method {
        "isActive" | "isNativePlayerActive" => Ok(to_json(&bridge.is_active().await?)),
        "getState" | "getPlayerState" => Ok(to_json(&bridge.get_state().await?)),
        "play" => bridge.play().await.map(|()| Value::Null),
        "pause" => bridge.pause().await.map(|()| Value::Null),
        "seek" => bridge
            .seek(SeekOptions::from_args(args))
            .await
            .map(|()| Value::Null),
        "setVolume" => bridge
            .set_volume(VolumeOptions::from_args(args))
            .await
            .map(|()| Value::Null),
        other => Err(BridgeError::UnknownMethod(other.to_string())),
    }
}
