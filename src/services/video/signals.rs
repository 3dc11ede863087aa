use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::trace;

use super::host::WindowRef;

/// Notification name posted when a host window becomes visible.
pub const WINDOW_DID_BECOME_VISIBLE: &str = "UIWindowDidBecomeVisibleNotification";

/// Notification name posted when a host window becomes hidden.
pub const WINDOW_DID_BECOME_HIDDEN: &str = "UIWindowDidBecomeHiddenNotification";

/// Notification name posted when a player item becomes the current item.
pub const PLAYER_ITEM_BECAME_CURRENT: &str = "AVPlayerItemBecameCurrentNotification";

/// Weakly typed ambient notification as delivered by the host.
#[derive(Clone)]
pub struct Notification {
    /// Notification name
    pub name: String,

    /// Window the notification refers to, if any
    pub object: Option<WindowRef>,
}

impl Notification {
    /// Creates a notification with an optional window object.
    pub fn new(name: impl Into<String>, object: Option<WindowRef>) -> Self {
        Self {
            name: name.into(),
            object,
        }
    }

    /// Window-became-visible notification for `window`.
    pub fn window_visible(window: WindowRef) -> Self {
        Self::new(WINDOW_DID_BECOME_VISIBLE, Some(window))
    }

    /// Window-became-hidden notification for `window`.
    pub fn window_hidden(window: WindowRef) -> Self {
        Self::new(WINDOW_DID_BECOME_HIDDEN, Some(window))
    }

    /// Player-item-became-current notification.
    pub fn item_became_current() -> Self {
        Self::new(PLAYER_ITEM_BECAME_CURRENT, None)
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("name", &self.name)
            .field("has_object", &self.object.is_some())
            .finish()
    }
}

/// Ambient UI signal, validated at the edge of the signal observer.
#[derive(Clone)]
pub enum UiSignal {
    /// A window became visible
    WindowBecameVisible(WindowRef),

    /// A window became hidden
    WindowBecameHidden(WindowRef),

    /// A player item became current somewhere in the host
    PlayerItemBecameCurrent,
}

impl UiSignal {
    /// Decodes a raw notification.
    ///
    /// Unknown names and visibility notifications without a window yield
    /// `None`; such notifications are dropped without error.
    pub fn decode(notification: &Notification) -> Option<Self> {
        match notification.name.as_str() {
            WINDOW_DID_BECOME_VISIBLE => notification
                .object
                .clone()
                .map(Self::WindowBecameVisible),
            WINDOW_DID_BECOME_HIDDEN => notification.object.clone().map(Self::WindowBecameHidden),
            PLAYER_ITEM_BECAME_CURRENT => Some(Self::PlayerItemBecameCurrent),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WindowBecameVisible(_) => "window_visible",
            Self::WindowBecameHidden(_) => "window_hidden",
            Self::PlayerItemBecameCurrent => "item_became_current",
        }
    }
}

impl fmt::Debug for UiSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Identity under which an observer registers with a [`SignalCenter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Wraps a raw identity.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Callback receiving notifications for one registration.
pub type SignalSink = Arc<dyn Fn(Notification) + Send + Sync>;

/// Thread-safe notification center for ambient host signals.
///
/// Registrations are keyed by `(observer, name)`; registering the same pair
/// again replaces the previous sink, so an observer never receives a
/// notification twice.
#[derive(Clone, Default)]
pub struct SignalCenter {
    registrations: Arc<RwLock<HashMap<ObserverId, HashMap<String, SignalSink>>>>,
}

impl SignalCenter {
    /// Creates an empty notification center.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` for notifications named `name` on behalf of `observer`.
    pub fn add_observer(&self, observer: ObserverId, name: &str, sink: SignalSink) {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        registrations
            .entry(observer)
            .or_default()
            .insert(name.to_string(), sink);
    }

    /// Removes every registration held by `observer`.
    pub fn remove_observer(&self, observer: ObserverId) {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        registrations.remove(&observer);
    }

    /// Whether `observer` holds any registration.
    pub fn is_observing(&self, observer: ObserverId) -> bool {
        let registrations = self
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        registrations.contains_key(&observer)
    }

    /// Delivers `notification` to every sink registered for its name.
    ///
    /// Safe to call from any thread. Sinks run on the caller's thread after
    /// the registry lock is released.
    pub fn post(&self, notification: Notification) {
        let sinks: Vec<SignalSink> = {
            let registrations = self
                .registrations
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            registrations
                .values()
                .filter_map(|by_name| by_name.get(&notification.name).cloned())
                .collect()
        };

        trace!(name = %notification.name, sinks = sinks.len(), "Posting notification");
        for sink in sinks {
            sink(notification.clone());
        }
    }
}
