use std::{mem, sync::Arc, time::Duration};

use futures::{
    StreamExt, future,
    stream::{self, BoxStream},
};
use tracing::{debug, info};

use crate::services::common::Property;

use super::{
    ActiveStatus, BridgeError, BridgeEvent, EventHub, HandleId, PlaybackState, PlayerHandle,
    SeekOptions, TimeUpdate, VideoOpenedInfo, VolumeOptions,
    host::PlayerRef,
    types::{known_duration, seconds},
};

/// Appearance edges produced by the signal observer.
pub(crate) enum Detection {
    /// A player surface became visible and nothing was tracked
    Appeared {
        handle: PlayerHandle,
        player: PlayerRef,
    },

    /// The tracked surface went away
    Disappeared { handle: PlayerHandle },
}

/// Notification coming from the active player's observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlaybackUpdate {
    RateChanged(f32),
    Tick(f64),
}

/// Resources held for exactly as long as one player is active.
///
/// Dropping it drops the rate-change and periodic-time streams, which
/// releases both native observers.
struct Activation {
    handle: PlayerHandle,
    player: PlayerRef,
    updates: BoxStream<'static, PlaybackUpdate>,
}

enum BridgeState {
    Idle,
    Active(Activation),
}

/// Owns the current player and turns its notifications into outward events.
///
/// Lives on the bridge's main context; nothing else touches it.
pub(crate) struct BridgeController {
    state: BridgeState,
    events: EventHub,
    active: Property<bool>,
    time_update_interval: Duration,
}

impl BridgeController {
    pub(crate) fn new(
        events: EventHub,
        active: Property<bool>,
        time_update_interval: Duration,
    ) -> Self {
        Self {
            state: BridgeState::Idle,
            events,
            active,
            time_update_interval,
        }
    }

    pub(crate) fn apply(&mut self, detection: Detection) {
        match detection {
            Detection::Appeared { handle, player } => self.activate(handle, player),
            Detection::Disappeared { handle } => self.deactivate(handle.id()),
        }
    }

    fn activate(&mut self, handle: PlayerHandle, player: PlayerRef) {
        if let BridgeState::Active(current) = &self.state {
            debug!(
                current = %current.handle.id(),
                ignored = %handle.id(),
                "Player already active, ignoring appearance"
            );
            return;
        }

        let info = VideoOpenedInfo::snapshot(player.as_ref());
        let updates = stream::select(
            player.rate_changes().map(PlaybackUpdate::RateChanged),
            player
                .periodic_time(self.time_update_interval)
                .map(PlaybackUpdate::Tick),
        )
        .boxed();

        info!(handle = %handle.id(), url = ?info.url, duration = ?info.duration, "Native player opened");

        self.state = BridgeState::Active(Activation {
            handle,
            player,
            updates,
        });
        self.active.set(true);
        self.events.emit(BridgeEvent::Opened(info));
    }

    fn deactivate(&mut self, id: HandleId) {
        let BridgeState::Active(activation) = &self.state else {
            debug!(handle = %id, "No active player, ignoring disappearance");
            return;
        };

        if activation.handle.id() != id {
            debug!(current = %activation.handle.id(), stale = %id, "Ignoring stale disappearance");
            return;
        }

        self.teardown();
    }

    /// Ends the current activation, if any, and reports whether one existed.
    pub(crate) fn teardown(&mut self) -> bool {
        let BridgeState::Active(activation) = mem::replace(&mut self.state, BridgeState::Idle)
        else {
            return false;
        };

        let id = activation.handle.id();
        drop(activation);

        self.active.set(false);
        info!(handle = %id, "Native player closed");
        self.events.emit(BridgeEvent::Closed);
        true
    }

    pub(crate) fn on_playback(&mut self, update: PlaybackUpdate) {
        let BridgeState::Active(activation) = &self.state else {
            return;
        };
        let player = activation.player.as_ref();

        let event = match update {
            PlaybackUpdate::RateChanged(rate) => {
                BridgeEvent::StateChanged(PlaybackState::snapshot(player, rate > 0.0))
            }
            PlaybackUpdate::Tick(position) => BridgeEvent::TimeUpdated(TimeUpdate {
                current_time: seconds(position),
                duration: known_duration(player.duration()),
            }),
        };

        self.events.emit(event);
    }

    /// Waits for the next notification of the active player.
    ///
    /// Never resolves while idle, or after the player's streams have ended.
    pub(crate) async fn next_update(&mut self) -> PlaybackUpdate {
        match &mut self.state {
            BridgeState::Active(activation) => match activation.updates.next().await {
                Some(update) => update,
                None => future::pending().await,
            },
            BridgeState::Idle => future::pending().await,
        }
    }

    fn player(&self) -> Result<&PlayerRef, BridgeError> {
        match &self.state {
            BridgeState::Active(activation) => Ok(&activation.player),
            BridgeState::Idle => Err(BridgeError::NoActivePlayer),
        }
    }

    pub(crate) fn is_active(&self) -> ActiveStatus {
        ActiveStatus {
            active: matches!(self.state, BridgeState::Active(_)),
        }
    }

    pub(crate) fn get_state(&self) -> Result<PlaybackState, BridgeError> {
        let player = self.player()?;
        let is_playing = player.rate() > 0.0 && player.failure().is_none();
        Ok(PlaybackState::snapshot(player.as_ref(), is_playing))
    }

    pub(crate) fn play(&self) -> Result<(), BridgeError> {
        self.player()?.play();
        Ok(())
    }

    pub(crate) fn pause(&self) -> Result<(), BridgeError> {
        self.player()?.pause();
        Ok(())
    }

    /// Validates a seek and returns the player and target to issue it against.
    pub(crate) fn prepare_seek(
        &self,
        options: SeekOptions,
    ) -> Result<(PlayerRef, f64), BridgeError> {
        let player = self.player()?;
        let target = options.target()?;
        Ok((Arc::clone(player), target))
    }

    pub(crate) fn set_volume(&self, options: VolumeOptions) -> Result<(), BridgeError> {
        let player = self.player()?;
        player.set_volume(options.level_checked()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::services::video::{
        EventName,
        host::{ControllerRef, NativePlayer},
        simulated::{SimulatedController, SimulatedPlayer},
    };

    fn controller() -> (BridgeController, EventHub, Property<bool>) {
        let events = EventHub::new();
        let active = Property::new(false);
        let controller =
            BridgeController::new(events.clone(), active.clone(), Duration::from_millis(500));
        (controller, events, active)
    }

    fn appeared(id: u64, player: &Arc<SimulatedPlayer>) -> (Detection, PlayerHandle) {
        let surface: ControllerRef = SimulatedController::with_player(player.clone());
        let handle = PlayerHandle::new(HandleId::new(id), surface);
        let detection = Detection::Appeared {
            handle: handle.clone(),
            player: player.clone(),
        };
        (detection, handle)
    }

    #[test]
    fn idle_commands_fail_with_no_active_player() {
        let (controller, _, _) = controller();

        assert_eq!(controller.is_active(), ActiveStatus { active: false });
        assert_eq!(controller.get_state(), Err(BridgeError::NoActivePlayer));
        assert_eq!(controller.play(), Err(BridgeError::NoActivePlayer));
        assert_eq!(controller.pause(), Err(BridgeError::NoActivePlayer));
        assert!(matches!(
            controller.prepare_seek(SeekOptions::at(3.0)),
            Err(BridgeError::NoActivePlayer)
        ));
        assert_eq!(
            controller.set_volume(VolumeOptions::level(0.5)),
            Err(BridgeError::NoActivePlayer)
        );
    }

    #[test]
    fn missing_arguments_checked_after_activity() {
        let (mut controller, _, _) = controller();
        assert!(matches!(
            controller.prepare_seek(SeekOptions::default()),
            Err(BridgeError::NoActivePlayer)
        ));

        let player = SimulatedPlayer::builder().build();
        let (detection, _) = appeared(1, &player);
        controller.apply(detection);

        assert!(matches!(
            controller.prepare_seek(SeekOptions::default()),
            Err(BridgeError::InvalidArgument { .. })
        ));
        assert!(matches!(
            controller.set_volume(VolumeOptions::default()),
            Err(BridgeError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn appearance_emits_opened_snapshot_once() {
        let (mut controller, events, active) = controller();
        let mut opened = events.add_listener(EventName::Opened);

        let player = SimulatedPlayer::builder()
            .url("https://example/v1")
            .duration(120.0)
            .build();
        let (first, _) = appeared(1, &player);
        let (second, _) = appeared(2, &player);

        controller.apply(first);
        controller.apply(second);

        assert_eq!(
            opened.recv().await,
            Some(BridgeEvent::Opened(VideoOpenedInfo {
                url: Some("https://example/v1".to_string()),
                duration: Some(120.0),
                is_playing: false,
            }))
        );
        assert!(opened.try_recv().is_none());
        assert!(active.get());
        assert_eq!(player.observer_count(), 2);
    }

    #[tokio::test]
    async fn stale_disappearance_is_ignored() {
        let (mut controller, events, _) = controller();
        let mut closed = events.add_listener(EventName::Closed);

        let player = SimulatedPlayer::builder().build();
        let (detection, _) = appeared(1, &player);
        controller.apply(detection);

        let other = SimulatedPlayer::builder().build();
        let (_, foreign) = appeared(9, &other);
        controller.apply(Detection::Disappeared { handle: foreign });

        assert!(controller.is_active().active);
        assert!(closed.try_recv().is_none());
    }

    #[tokio::test]
    async fn disappearance_tears_down_observers_and_emits_closed() {
        let (mut controller, events, active) = controller();
        let mut closed = events.add_listener(EventName::Closed);

        let player = SimulatedPlayer::builder().build();
        let (detection, handle) = appeared(1, &player);
        controller.apply(detection);
        controller.apply(Detection::Disappeared {
            handle: handle.clone(),
        });
        controller.apply(Detection::Disappeared { handle });

        assert_eq!(closed.recv().await, Some(BridgeEvent::Closed));
        assert!(closed.try_recv().is_none());
        assert!(!active.get());
        assert_eq!(player.observer_count(), 0);
        assert!(!controller.teardown());
    }

    #[tokio::test]
    async fn rate_change_emits_state_changed() {
        let (mut controller, events, _) = controller();
        let mut changes = events.add_listener(EventName::StateChanged);

        let player = SimulatedPlayer::builder()
            .current_time(10.0)
            .duration(120.0)
            .build();
        let (detection, _) = appeared(1, &player);
        controller.apply(detection);

        player.play();
        let update = controller.next_update().await;
        assert_eq!(update, PlaybackUpdate::RateChanged(1.0));
        controller.on_playback(update);

        let Some(BridgeEvent::StateChanged(state)) = changes.recv().await else {
            panic!("expected stateChanged");
        };
        assert!(state.is_playing);
        assert_eq!(state.duration, Some(120.0));
    }

    #[test]
    fn playback_updates_while_idle_are_dropped() {
        let (mut controller, events, _) = controller();
        let mut ticks = events.add_listener(EventName::TimeUpdated);

        controller.on_playback(PlaybackUpdate::Tick(3.0));
        assert!(ticks.try_recv().is_none());
    }

    #[test]
    fn failed_player_reports_not_playing() {
        let (mut controller, _, _) = controller();
        let player = SimulatedPlayer::builder().playing(true).build();
        let (detection, _) = appeared(1, &player);
        controller.apply(detection);

        assert!(controller.get_state().unwrap().is_playing);
        player.fail("decode error");
        assert!(!controller.get_state().unwrap().is_playing);
    }
}
