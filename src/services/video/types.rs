use std::fmt;

use serde::{Deserialize, Serialize};

use super::host::{ControllerRef, NativePlayer};

/// Identity of one activation of a tracked player surface.
///
/// A fresh id is minted for every appearance, even when the same surface
/// comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Wraps a raw activation counter.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Opaque reference to the currently tracked native player surface.
#[derive(Clone)]
pub struct PlayerHandle {
    id: HandleId,
    surface: ControllerRef,
}

impl PlayerHandle {
    pub(crate) fn new(id: HandleId, surface: ControllerRef) -> Self {
        Self { id, surface }
    }

    /// Activation id of this handle.
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn surface(&self) -> &ControllerRef {
        &self.surface
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle").field("id", &self.id).finish()
    }
}

/// Playback state derived on demand from the tracked player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Whether the player is currently playing
    pub is_playing: bool,

    /// Current position in seconds
    pub current_time: f64,

    /// Item duration in seconds, absent while unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl PlaybackState {
    pub(crate) fn snapshot(player: &dyn NativePlayer, is_playing: bool) -> Self {
        Self {
            is_playing,
            current_time: seconds(player.current_time()),
            duration: known_duration(player.duration()),
        }
    }
}

/// Snapshot of a player taken once when it appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOpenedInfo {
    /// Asset URL when the underlying item is a locatable resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Item duration in seconds, absent while unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Whether the player was playing at appearance time
    pub is_playing: bool,
}

impl VideoOpenedInfo {
    pub(crate) fn snapshot(player: &dyn NativePlayer) -> Self {
        Self {
            url: player.asset_url(),
            duration: known_duration(player.duration()),
            is_playing: player.rate() > 0.0,
        }
    }
}

/// Periodic position update emitted while a player is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeUpdate {
    /// Position in seconds at the tick
    pub current_time: f64,

    /// Item duration in seconds, absent while unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Result of the `isActive` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStatus {
    /// True while a native player surface is tracked
    pub active: bool,
}

pub(crate) fn seconds(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 { raw } else { 0.0 }
}

pub(crate) fn known_duration(raw: Option<f64>) -> Option<f64> {
    raw.filter(|d| d.is_finite() && *d >= 0.0)
}
