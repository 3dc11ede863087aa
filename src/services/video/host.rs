use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Shared reference to a native player object.
pub type PlayerRef = Arc<dyn NativePlayer>;

/// Shared reference to a node of the host's view-controller tree.
pub type ControllerRef = Arc<dyn ViewController>;

/// Shared reference to a host window.
pub type WindowRef = Arc<dyn HostWindow>;

/// Outcome reported by the native layer once a seek settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekCompletion {
    /// The player reached the requested position
    Finished,

    /// The seek was abandoned, usually because a later seek superseded it
    Interrupted,
}

/// A platform media player instance that is already playing outside the web view.
///
/// Implementations wrap the host's native player object. Notification streams
/// returned by [`rate_changes`](NativePlayer::rate_changes) and
/// [`periodic_time`](NativePlayer::periodic_time) must release their native
/// observer when dropped, and dropping them after the player is gone must be
/// harmless.
#[async_trait]
pub trait NativePlayer: Send + Sync {
    /// Current playback rate; anything above zero means playing.
    fn rate(&self) -> f32;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Duration of the current item in seconds, if known.
    fn duration(&self) -> Option<f64>;

    /// URL of the current asset when it is a locatable resource.
    fn asset_url(&self) -> Option<String>;

    /// Description of a playback failure, if the player has entered one.
    fn failure(&self) -> Option<String> {
        None
    }

    /// Starts playback.
    fn play(&self);

    /// Pauses playback.
    fn pause(&self);

    /// Sets the output volume in the `0.0..=1.0` range.
    fn set_volume(&self, volume: f32);

    /// Seeks to `to` seconds and resolves once the native layer settles the request.
    async fn seek(&self, to: f64) -> SeekCompletion;

    /// Stream of playback rates, one item per native rate-change notification.
    fn rate_changes(&self) -> BoxStream<'static, f32>;

    /// Stream of playback positions delivered every `interval` while subscribed.
    fn periodic_time(&self, interval: Duration) -> BoxStream<'static, f64>;
}

/// A node of the host's view-controller hierarchy.
pub trait ViewController: Send + Sync {
    /// Whether this node is a native player surface, with or without a player.
    fn is_player_surface(&self) -> bool;

    /// Player currently attached to this surface.
    fn player(&self) -> Option<PlayerRef>;

    /// Controller presented modally on top of this one.
    fn presented(&self) -> Option<ControllerRef>;

    /// Child controllers in display order.
    fn children(&self) -> Vec<ControllerRef>;
}

/// A top-level host window.
pub trait HostWindow: Send + Sync {
    /// Root of the window's view-controller tree.
    fn root_view_controller(&self) -> Option<ControllerRef>;

    /// Whether this window currently receives key input.
    fn is_key(&self) -> bool;
}

/// The host application, used to locate the foreground window.
pub trait HostApplication: Send + Sync {
    /// All windows currently known to the host.
    fn windows(&self) -> Vec<WindowRef>;

    /// First window reporting itself as key.
    fn key_window(&self) -> Option<WindowRef> {
        self.windows().into_iter().find(|window| window.is_key())
    }
}

impl fmt::Debug for dyn NativePlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativePlayer")
            .field("rate", &self.rate())
            .field("current_time", &self.current_time())
            .field("duration", &self.duration())
            .finish()
    }
}
