//! In-memory host collaborators.
//!
//! Stand-ins for the host window hierarchy and a native player, used by the
//! replay CLI and by tests. The player clock runs on tokio's `Instant`, so it
//! follows a paused test clock.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_stream::stream;
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use tokio::{sync::broadcast, time::Instant};
use tokio_stream::wrappers::BroadcastStream;

use super::host::{
    ControllerRef, HostApplication, HostWindow, NativePlayer, PlayerRef, SeekCompletion,
    ViewController, WindowRef,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Clock {
    rate: f32,
    base_time: f64,
    anchor: Instant,
    duration: Option<f64>,
    url: Option<String>,
    volume: f32,
    failure: Option<String>,
    seek_generation: u64,
}

impl Clock {
    fn position(&self) -> f64 {
        let elapsed = self.anchor.elapsed().as_secs_f64() * f64::from(self.rate);
        let position = self.base_time + elapsed;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn rebase(&mut self) {
        self.base_time = self.position();
        self.anchor = Instant::now();
    }
}

struct PlayerInner {
    clock: Mutex<Clock>,
    rate_tx: broadcast::Sender<f32>,
    seek_latency: Duration,
    observers: AtomicUsize,
}

struct ObserverGuard(Arc<PlayerInner>);

impl ObserverGuard {
    fn new(inner: &Arc<PlayerInner>) -> Self {
        inner.observers.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(inner))
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.0.observers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Native player simulation with a real-time clock.
pub struct SimulatedPlayer {
    inner: Arc<PlayerInner>,
}

/// Builder for [`SimulatedPlayer`].
#[derive(Debug, Default)]
pub struct SimulatedPlayerBuilder {
    url: Option<String>,
    duration: Option<f64>,
    current_time: f64,
    playing: bool,
    seek_latency: Duration,
}

impl SimulatedPlayerBuilder {
    /// Asset URL reported by the player.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Item duration in seconds.
    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Starting position in seconds.
    pub fn current_time(mut self, seconds: f64) -> Self {
        self.current_time = seconds;
        self
    }

    /// Whether the player starts out playing.
    pub fn playing(mut self, playing: bool) -> Self {
        self.playing = playing;
        self
    }

    /// How long a seek takes to settle.
    pub fn seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = latency;
        self
    }

    /// Creates the player.
    pub fn build(self) -> Arc<SimulatedPlayer> {
        let (rate_tx, _) = broadcast::channel(64);

        let clock = Clock {
            rate: if self.playing { 1.0 } else { 0.0 },
            base_time: self.current_time,
            anchor: Instant::now(),
            duration: self.duration,
            url: self.url,
            volume: 1.0,
            failure: None,
            seek_generation: 0,
        };

        Arc::new(SimulatedPlayer {
            inner: Arc::new(PlayerInner {
                clock: Mutex::new(clock),
                rate_tx,
                seek_latency: self.seek_latency,
                observers: AtomicUsize::new(0),
            }),
        })
    }
}

impl SimulatedPlayer {
    /// Starts building a paused player at position zero.
    pub fn builder() -> SimulatedPlayerBuilder {
        SimulatedPlayerBuilder::default()
    }

    /// Last volume set on the player.
    pub fn volume(&self) -> f32 {
        lock(&self.inner.clock).volume
    }

    /// Number of live rate-change and periodic-time observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.load(Ordering::SeqCst)
    }

    /// Puts the player into a failed state.
    pub fn fail(&self, reason: impl Into<String>) {
        lock(&self.inner.clock).failure = Some(reason.into());
    }

    fn set_rate(&self, rate: f32) {
        {
            let mut clock = lock(&self.inner.clock);
            clock.rebase();
            clock.rate = rate;
        }
        let _ = self.inner.rate_tx.send(rate);
    }
}

#[async_trait]
impl NativePlayer for SimulatedPlayer {
    fn rate(&self) -> f32 {
        lock(&self.inner.clock).rate
    }

    fn current_time(&self) -> f64 {
        lock(&self.inner.clock).position()
    }

    fn duration(&self) -> Option<f64> {
        lock(&self.inner.clock).duration
    }

    fn asset_url(&self) -> Option<String> {
        lock(&self.inner.clock).url.clone()
    }

    fn failure(&self) -> Option<String> {
        lock(&self.inner.clock).failure.clone()
    }

    fn play(&self) {
        self.set_rate(1.0);
    }

    fn pause(&self) {
        self.set_rate(0.0);
    }

    fn set_volume(&self, volume: f32) {
        lock(&self.inner.clock).volume = volume;
    }

    async fn seek(&self, to: f64) -> SeekCompletion {
        let generation = {
            let mut clock = lock(&self.inner.clock);
            clock.seek_generation += 1;
            clock.seek_generation
        };

        if !self.inner.seek_latency.is_zero() {
            tokio::time::sleep(self.inner.seek_latency).await;
        }

        let mut clock = lock(&self.inner.clock);
        if clock.seek_generation != generation {
            return SeekCompletion::Interrupted;
        }

        let target = match clock.duration {
            Some(duration) => to.max(0.0).min(duration),
            None => to.max(0.0),
        };
        clock.base_time = target;
        clock.anchor = Instant::now();
        SeekCompletion::Finished
    }

    fn rate_changes(&self) -> BoxStream<'static, f32> {
        let guard = ObserverGuard::new(&self.inner);
        let mut changes = BroadcastStream::new(self.inner.rate_tx.subscribe());

        stream! {
            let _guard = guard;
            while let Some(change) = changes.next().await {
                if let Ok(rate) = change {
                    yield rate;
                }
            }
        }
        .boxed()
    }

    fn periodic_time(&self, interval: Duration) -> BoxStream<'static, f64> {
        let guard = ObserverGuard::new(&self.inner);
        let inner = Arc::clone(&self.inner);

        stream! {
            let _guard = guard;
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let position = lock(&inner.clock).position();
                yield position;
            }
        }
        .boxed()
    }
}

/// View-controller node whose presented controller and children can change.
#[derive(Default)]
pub struct SimulatedController {
    surface: bool,
    player: Mutex<Option<PlayerRef>>,
    presented: Mutex<Option<ControllerRef>>,
    children: Mutex<Vec<ControllerRef>>,
}

impl SimulatedController {
    /// A controller that is not a player surface.
    pub fn plain() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A native player surface with no player attached.
    pub fn surface() -> Arc<Self> {
        Arc::new(Self {
            surface: true,
            ..Self::default()
        })
    }

    /// A native player surface presenting `player`.
    pub fn with_player(player: PlayerRef) -> Arc<Self> {
        Arc::new(Self {
            surface: true,
            player: Mutex::new(Some(player)),
            ..Self::default()
        })
    }

    /// Attaches or detaches the surface's player.
    pub fn set_player(&self, player: Option<PlayerRef>) {
        *lock(&self.player) = player;
    }

    /// Presents `controller` modally on top of this one.
    pub fn present(&self, controller: ControllerRef) {
        *lock(&self.presented) = Some(controller);
    }

    /// Appends a child controller.
    pub fn add_child(&self, controller: ControllerRef) {
        lock(&self.children).push(controller);
    }
}

impl ViewController for SimulatedController {
    fn is_player_surface(&self) -> bool {
        self.surface
    }

    fn player(&self) -> Option<PlayerRef> {
        lock(&self.player).clone()
    }

    fn presented(&self) -> Option<ControllerRef> {
        lock(&self.presented).clone()
    }

    fn children(&self) -> Vec<ControllerRef> {
        lock(&self.children).clone()
    }
}

/// Host window with a swappable root controller.
pub struct SimulatedWindow {
    root: Mutex<Option<ControllerRef>>,
    key: AtomicBool,
}

impl SimulatedWindow {
    /// Creates a window.
    pub fn new(root: Option<ControllerRef>, key: bool) -> Arc<Self> {
        Arc::new(Self {
            root: Mutex::new(root),
            key: AtomicBool::new(key),
        })
    }

    /// Replaces the root controller.
    pub fn set_root(&self, root: Option<ControllerRef>) {
        *lock(&self.root) = root;
    }

    /// Marks the window as key or not.
    pub fn set_key(&self, key: bool) {
        self.key.store(key, Ordering::SeqCst);
    }
}

impl HostWindow for SimulatedWindow {
    fn root_view_controller(&self) -> Option<ControllerRef> {
        lock(&self.root).clone()
    }

    fn is_key(&self) -> bool {
        self.key.load(Ordering::SeqCst)
    }
}

/// Host application holding an ordered list of windows.
#[derive(Default)]
pub struct SimulatedHost {
    windows: Mutex<Vec<WindowRef>>,
}

impl SimulatedHost {
    /// Creates a host with no windows.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a window on top of the existing ones.
    pub fn add_window(&self, window: WindowRef) {
        lock(&self.windows).push(window);
    }
}

impl HostApplication for SimulatedHost {
    fn windows(&self) -> Vec<WindowRef> {
        lock(&self.windows).clone()
    }
}
