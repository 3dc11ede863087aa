use std::{
    collections::HashMap,
    fmt,
    pin::Pin,
    str::FromStr,
    sync::{
        Arc, PoisonError, RwLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use futures::Stream;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::trace;

use super::{BridgeError, PlaybackState, TimeUpdate, VideoOpenedInfo};

/// Names of the outward events a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// A native player surface appeared
    Opened,

    /// The tracked surface disappeared
    Closed,

    /// The player switched between playing and paused
    StateChanged,

    /// Periodic position update
    TimeUpdated,
}

impl EventName {
    /// Every event name, in lifecycle order.
    pub const ALL: [EventName; 4] = [
        EventName::Opened,
        EventName::Closed,
        EventName::StateChanged,
        EventName::TimeUpdated,
    ];

    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::StateChanged => "stateChanged",
            Self::TimeUpdated => "timeUpdated",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "opened" | "videoPlayerOpened" => Ok(Self::Opened),
            "closed" | "videoPlayerClosed" => Ok(Self::Closed),
            "stateChanged" | "videoPlaybackStateChanged" => Ok(Self::StateChanged),
            "timeUpdated" | "videoTimeUpdated" => Ok(Self::TimeUpdated),
            other => Err(BridgeError::InvalidArgument {
                arg: "eventName".to_string(),
                reason: format!("unknown event '{other}'"),
            }),
        }
    }
}

/// Event delivered to the web layer.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// Snapshot taken when a player surface appeared
    Opened(VideoOpenedInfo),

    /// The tracked surface went away
    Closed,

    /// Playback state after a rate change
    StateChanged(PlaybackState),

    /// Position at a periodic tick
    TimeUpdated(TimeUpdate),
}

impl BridgeEvent {
    /// Name listeners subscribe with to receive this event.
    pub fn name(&self) -> EventName {
        match self {
            Self::Opened(_) => EventName::Opened,
            Self::Closed => EventName::Closed,
            Self::StateChanged(_) => EventName::StateChanged,
            Self::TimeUpdated(_) => EventName::TimeUpdated,
        }
    }

    /// JSON payload as marshaled across the web boundary.
    pub fn payload(&self) -> Value {
        match self {
            Self::Opened(info) => to_json(info),
            Self::Closed => json!({}),
            Self::StateChanged(state) => to_json(state),
            Self::TimeUpdated(update) => to_json(update),
        }
    }
}

pub(crate) fn to_json(payload: &impl Serialize) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

struct Listener {
    filter: Option<EventName>,
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

#[derive(Default)]
struct HubInner {
    listeners: RwLock<HashMap<u64, Listener>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn remove(&self, id: u64) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Publish/subscribe channel from the bridge to the web layer.
///
/// Every listener gets its own queue and its own [`EventSubscription`];
/// revoking one never affects the others or the bridge itself.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// Creates a hub with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `name`.
    pub fn add_listener(&self, name: EventName) -> EventSubscription {
        self.register(Some(name))
    }

    /// Registers a listener receiving every event in emission order.
    pub fn add_global_listener(&self) -> EventSubscription {
        self.register(None)
    }

    fn register(&self, filter: Option<EventName>) -> EventSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Listener { filter, tx });

        EventSubscription {
            id,
            filter,
            hub: Arc::downgrade(&self.inner),
            rx,
        }
    }

    /// Drops every listener. Calling it again is a no-op.
    pub fn remove_all_listeners(&self) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn emit(&self, event: BridgeEvent) {
        let name = event.name();
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        listeners.retain(|_, listener| {
            if listener.filter.is_some_and(|filter| filter != name) {
                return true;
            }
            listener.tx.send(event.clone()).is_ok()
        });

        trace!(event = %name, listeners = listeners.len(), "Emitted bridge event");
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Ownership token for one registered listener.
///
/// Receives the listener's events through [`recv`](Self::recv) or as a
/// [`Stream`]. Dropping it, or calling [`remove`](Self::remove), stops
/// delivery to this listener only.
pub struct EventSubscription {
    id: u64,
    filter: Option<EventName>,
    hub: Weak<HubInner>,
    rx: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl EventSubscription {
    /// Event name this listener was registered for; `None` for a global listener.
    pub fn name(&self) -> Option<EventName> {
        self.filter
    }

    /// Waits for the next event; `None` once the listener has been removed.
    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        self.rx.recv().await
    }

    /// Returns an already queued event without waiting.
    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        self.rx.try_recv().ok()
    }

    /// Revokes this listener.
    pub fn remove(self) {}
}

impl Stream for EventSubscription {
    type Item = BridgeEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("name", &self.filter)
            .finish()
    }
}
