use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, instrument};

use super::{
    HandleId, PlayerHandle,
    controller::Detection,
    hierarchy::find_player_surface,
    host::{HostApplication, WindowRef},
    runtime::MainMessage,
    signals::UiSignal,
};

struct PendingCheck {
    token: u64,
    task: JoinHandle<()>,
}

impl Drop for PendingCheck {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Turns ambient UI signals into clean appear/disappear edges.
///
/// Holds only the identity of the tracked surface, never playback state.
/// Emission of [`Detection::Appeared`] is gated on nothing being tracked, so
/// racing signals for one appearance produce a single edge.
pub(crate) struct SignalObserver {
    host: Arc<dyn HostApplication>,
    mailbox: mpsc::UnboundedSender<MainMessage>,
    item_debounce: Duration,
    observing: bool,
    tracked: Option<PlayerHandle>,
    pending: Option<PendingCheck>,
    next_handle: u64,
    next_token: u64,
}

impl SignalObserver {
    pub(crate) fn new(
        host: Arc<dyn HostApplication>,
        mailbox: mpsc::UnboundedSender<MainMessage>,
        item_debounce: Duration,
    ) -> Self {
        Self {
            host,
            mailbox,
            item_debounce,
            observing: false,
            tracked: None,
            pending: None,
            next_handle: 0,
            next_token: 0,
        }
    }

    pub(crate) fn set_observing(&mut self, observing: bool) {
        if self.observing == observing {
            return;
        }

        info!(observing, "Signal observation toggled");
        self.observing = observing;
        if !observing {
            self.pending = None;
        }
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.tracked.is_some()
    }

    /// Forgets the tracked surface without emitting an edge.
    pub(crate) fn reset(&mut self) {
        self.tracked = None;
        self.pending = None;
    }

    #[instrument(skip(self), fields(tracked = self.tracked.is_some()))]
    pub(crate) fn handle(&mut self, signal: UiSignal) -> Option<Detection> {
        if !self.observing {
            debug!("Not observing, dropping signal");
            return None;
        }

        match signal {
            UiSignal::WindowBecameVisible(window) => self.window_visible(&window),
            UiSignal::WindowBecameHidden(window) => self.window_hidden(&window),
            UiSignal::PlayerItemBecameCurrent => {
                self.schedule_item_check();
                None
            }
        }
    }

    /// Runs the delayed key-window check scheduled by an item-changed signal.
    pub(crate) fn item_check_elapsed(&mut self, token: u64) -> Option<Detection> {
        match &self.pending {
            Some(pending) if pending.token == token => {}
            _ => {
                debug!(token, "Dropping superseded item check");
                return None;
            }
        }
        self.pending = None;

        if !self.observing || self.tracked.is_some() {
            debug!("Player already tracked, item check is a no-op");
            return None;
        }

        let window = self.host.key_window()?;
        self.detect_in(&window)
    }

    fn window_visible(&mut self, window: &WindowRef) -> Option<Detection> {
        if self.tracked.is_some() {
            debug!("Player already tracked, ignoring visible window");
            return None;
        }
        self.detect_in(window)
    }

    fn window_hidden(&mut self, window: &WindowRef) -> Option<Detection> {
        let tracked = self.tracked.as_ref()?;
        let found = find_player_surface(window.root_view_controller().as_ref())?;

        if !found.is_surface(tracked.surface()) {
            debug!(tracked = %tracked.id(), "Hidden window holds a different surface");
            return None;
        }

        let handle = self.tracked.take()?;
        Some(Detection::Disappeared { handle })
    }

    fn detect_in(&mut self, window: &WindowRef) -> Option<Detection> {
        let found = find_player_surface(window.root_view_controller().as_ref())?;
        let Some(player) = found.player else {
            debug!("Player surface holds no player yet");
            return None;
        };

        self.next_handle += 1;
        let handle = PlayerHandle::new(HandleId::new(self.next_handle), found.surface);
        self.tracked = Some(handle.clone());

        debug!(handle = %handle.id(), "Player surface detected");
        Some(Detection::Appeared { handle, player })
    }

    fn schedule_item_check(&mut self) {
        self.next_token += 1;
        let token = self.next_token;
        let delay = self.item_debounce;
        let mailbox = self.mailbox.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = mailbox.send(MainMessage::ItemCheckElapsed { token });
        });

        self.pending = Some(PendingCheck { token, task });
    }
}
