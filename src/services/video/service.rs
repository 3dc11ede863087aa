use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::Stream;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, instrument};

use crate::services::common::Property;

use super::{
    ActiveStatus, BridgeError, EventHub, EventName, EventSubscription, PlaybackState, SeekOptions,
    VolumeOptions,
    controller::BridgeController,
    host::HostApplication,
    observer::SignalObserver,
    runtime::{Command, MainContext, MainMessage, Reply},
    signals::{
        Notification, ObserverId, PLAYER_ITEM_BECAME_CURRENT, SignalCenter, SignalSink, UiSignal,
        WINDOW_DID_BECOME_HIDDEN, WINDOW_DID_BECOME_VISIBLE,
    },
};

static NEXT_OBSERVER: AtomicU64 = AtomicU64::new(1);

/// Timing knobs of a native bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Cadence of `timeUpdated` events while a player is active
    pub time_update_interval: Duration,

    /// Settle delay before the item-changed detection path inspects the key window
    pub item_debounce: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_update_interval: Duration::from_millis(500),
            item_debounce: Duration::from_millis(100),
        }
    }
}

/// Command and event surface exposed to the web layer.
///
/// Every command resolves or rejects with a [`BridgeError`]. Listener
/// management is synchronous and never touches the bridge's state machine.
#[async_trait]
pub trait VideoBridge: Send + Sync {
    /// Whether a native player surface is currently tracked.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Unsupported` on the fallback bridge.
    async fn is_active(&self) -> Result<ActiveStatus, BridgeError>;

    /// Playback state of the tracked player.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NoActivePlayer` when no player is tracked.
    async fn get_state(&self) -> Result<PlaybackState, BridgeError>;

    /// Starts playback.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NoActivePlayer` when no player is tracked.
    async fn play(&self) -> Result<(), BridgeError>;

    /// Pauses playback.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NoActivePlayer` when no player is tracked.
    async fn pause(&self) -> Result<(), BridgeError>;

    /// Seeks and resolves once the player confirms the new position.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NoActivePlayer` when no player is tracked,
    /// `BridgeError::InvalidArgument` when the time is missing, and
    /// `BridgeError::SeekInterrupted` when a later seek superseded this one.
    async fn seek(&self, options: SeekOptions) -> Result<(), BridgeError>;

    /// Sets the player volume.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NoActivePlayer` when no player is tracked and
    /// `BridgeError::InvalidArgument` when the volume is missing.
    async fn set_volume(&self, options: VolumeOptions) -> Result<(), BridgeError>;

    /// Registers a listener for one event name.
    fn add_listener(&self, name: EventName) -> EventSubscription;

    /// Registers a listener for every event, delivered in emission order.
    fn add_global_listener(&self) -> EventSubscription;

    /// Removes every listener. Safe to call repeatedly.
    fn remove_all_listeners(&self);
}

struct ActorTask {
    handle: JoinHandle<()>,
    signals: SignalCenter,
    observer_id: ObserverId,
}

impl Drop for ActorTask {
    fn drop(&mut self) {
        self.signals.remove_observer(self.observer_id);
        self.handle.abort();
    }
}

/// Bridge to a native player surface presented by the host application.
///
/// All state lives on a single main-context task. Host signals posted to the
/// [`SignalCenter`] and commands issued through [`VideoBridge`] are queued
/// onto it, so they never race each other.
#[derive(Clone)]
pub struct NativeVideoBridge {
    mailbox: mpsc::UnboundedSender<MainMessage>,
    events: EventHub,
    active: Property<bool>,
    task: Arc<ActorTask>,
}

impl NativeVideoBridge {
    /// Starts the bridge and begins observing `signals`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, since the main context is
    /// spawned onto the current one.
    #[instrument(skip(host, signals))]
    pub fn start(
        host: Arc<dyn HostApplication>,
        signals: SignalCenter,
        settings: Settings,
    ) -> Self {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let events = EventHub::new();
        let active = Property::new(false);

        let observer = SignalObserver::new(host, mailbox.clone(), settings.item_debounce);
        let controller = BridgeController::new(
            events.clone(),
            active.clone(),
            settings.time_update_interval,
        );
        let handle = tokio::spawn(MainContext::new(observer, controller, inbox).run());

        let observer_id = ObserverId::new(NEXT_OBSERVER.fetch_add(1, Ordering::Relaxed));
        info!(?observer_id, "Starting native video bridge");

        let bridge = Self {
            mailbox,
            events,
            active,
            task: Arc::new(ActorTask {
                handle,
                signals,
                observer_id,
            }),
        };
        bridge.start_observing();
        bridge
    }

    /// Subscribes to host signals. Calling it again changes nothing.
    pub fn start_observing(&self) {
        let signals = &self.task.signals;
        for name in [
            WINDOW_DID_BECOME_VISIBLE,
            WINDOW_DID_BECOME_HIDDEN,
            PLAYER_ITEM_BECAME_CURRENT,
        ] {
            signals.add_observer(self.task.observer_id, name, self.sink());
        }
        let _ = self.mailbox.send(MainMessage::Observe(true));
    }

    /// Drops every host signal registration. Calling it again changes nothing.
    ///
    /// A tracked player stays active until the bridge shuts down.
    pub fn stop_observing(&self) {
        self.task.signals.remove_observer(self.task.observer_id);
        let _ = self.mailbox.send(MainMessage::Observe(false));
    }

    /// Whether host signals are currently delivered to this bridge.
    pub fn is_observing(&self) -> bool {
        self.task.signals.is_observing(self.task.observer_id)
    }

    /// Stream of the active flag: the current value, then every change.
    pub fn active_monitored(&self) -> impl Stream<Item = bool> + Send + use<> {
        self.active.watch()
    }

    /// Stops observing, closes any active player and ends the main context.
    ///
    /// Resolves once `closed` has been emitted for a live activation.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.stop_observing();

        let (done, finished) = oneshot::channel();
        if self.mailbox.send(MainMessage::Shutdown(done)).is_err() {
            debug!("Main context already stopped");
            return;
        }
        let _ = finished.await;
    }

    fn sink(&self) -> SignalSink {
        let mailbox = self.mailbox.clone();
        Arc::new(move |notification: Notification| {
            let Some(signal) = UiSignal::decode(&notification) else {
                debug!(name = %notification.name, "Dropping undecodable notification");
                return;
            };
            let _ = mailbox.send(MainMessage::Signal(signal));
        })
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(MainMessage::Command(command(reply)))
            .map_err(|_| BridgeError::Unavailable)?;
        response.await.map_err(|_| BridgeError::Unavailable)?
    }
}

impl fmt::Debug for NativeVideoBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeVideoBridge")
            .field("observer_id", &self.task.observer_id)
            .field("active", &self.active.get())
            .finish()
    }
}

#[async_trait]
impl VideoBridge for NativeVideoBridge {
    async fn is_active(&self) -> Result<ActiveStatus, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(MainMessage::Command(Command::IsActive(reply)))
            .map_err(|_| BridgeError::Unavailable)?;
        response.await.map_err(|_| BridgeError::Unavailable)
    }

    async fn get_state(&self) -> Result<PlaybackState, BridgeError> {
        self.request(Command::GetState).await
    }

    async fn play(&self) -> Result<(), BridgeError> {
        self.request(Command::Play).await
    }

    async fn pause(&self) -> Result<(), BridgeError> {
        self.request(Command::Pause).await
    }

    async fn seek(&self, options: SeekOptions) -> Result<(), BridgeError> {
        self.request(|reply| Command::Seek(options, reply)).await
    }

    async fn set_volume(&self, options: VolumeOptions) -> Result<(), BridgeError> {
        self.request(|reply| Command::SetVolume(options, reply)).await
    }

    fn add_listener(&self, name: EventName) -> EventSubscription {
        self.events.add_listener(name)
    }

    fn add_global_listener(&self) -> EventSubscription {
        self.events.add_global_listener()
    }

    fn remove_all_listeners(&self) {
        self.events.remove_all_listeners();
    }
}

/// Bridge for execution environments without native player surfaces.
///
/// Every command fails with [`BridgeError::Unsupported`] and no event is
/// ever delivered.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedVideoBridge {
    events: EventHub,
}

impl UnsupportedVideoBridge {
    /// Creates the fallback bridge.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoBridge for UnsupportedVideoBridge {
    async fn is_active(&self) -> Result<ActiveStatus, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    async fn get_state(&self) -> Result<PlaybackState, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    async fn play(&self) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    async fn pause(&self) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    async fn seek(&self, _options: SeekOptions) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    async fn set_volume(&self, _options: VolumeOptions) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn add_listener(&self, name: EventName) -> EventSubscription {
        self.events.add_listener(name)
    }

    fn add_global_listener(&self) -> EventSubscription {
        self.events.add_global_listener()
    }

    fn remove_all_listeners(&self) {
        self.events.remove_all_listeners();
    }
}
