//! Integration tests for the native video bridge driven by a simulated host.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, future};
use native_video_bridge::services::video::{
    ActiveStatus, BridgeError, BridgeEvent, EventName, EventSubscription, NativeVideoBridge,
    PlaybackState, SeekOptions, Settings, UnsupportedVideoBridge, VideoBridge, VideoOpenedInfo,
    VolumeOptions, dispatch,
    host::NativePlayer,
    signals::{Notification, SignalCenter},
    simulated::{SimulatedController, SimulatedHost, SimulatedPlayer, SimulatedWindow},
};
use serde_json::json;
use tokio::time::Instant;

struct Harness {
    signals: SignalCenter,
    host: Arc<SimulatedHost>,
    bridge: NativeVideoBridge,
}

impl Harness {
    fn start() -> Self {
        let signals = SignalCenter::new();
        let host = SimulatedHost::new();
        let bridge = NativeVideoBridge::start(host.clone(), signals.clone(), Settings::default());
        Self {
            signals,
            host,
            bridge,
        }
    }

    fn show(&self, window: &Arc<SimulatedWindow>) {
        self.signals.post(Notification::window_visible(window.clone()));
    }

    fn hide(&self, window: &Arc<SimulatedWindow>) {
        self.signals.post(Notification::window_hidden(window.clone()));
    }
}

/// A window whose root presents a player surface modally.
fn player_window(player: &Arc<SimulatedPlayer>, key: bool) -> Arc<SimulatedWindow> {
    let root = SimulatedController::plain();
    root.present(SimulatedController::with_player(player.clone()));
    SimulatedWindow::new(Some(root), key)
}

fn example_player() -> Arc<SimulatedPlayer> {
    SimulatedPlayer::builder()
        .url("https://example/v1")
        .duration(120.0)
        .current_time(10.0)
        .build()
}

fn drain(subscription: &mut EventSubscription) -> usize {
    let mut count = 0;
    while subscription.try_recv().is_some() {
        count += 1;
    }
    count
}

mod lifecycle {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn visible_window_opens_player() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);

        let window = player_window(&example_player(), true);
        h.show(&window);

        assert_eq!(
            opened.recv().await,
            Some(BridgeEvent::Opened(VideoOpenedInfo {
                url: Some("https://example/v1".to_string()),
                duration: Some(120.0),
                is_playing: false,
            }))
        );
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: true }));
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: true }));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_visible_signals_open_once() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);

        let window = player_window(&example_player(), true);
        h.show(&window);
        h.show(&window);
        h.signals.post(Notification::item_became_current());
        tokio::time::sleep(Duration::from_millis(300)).await;

        h.bridge.is_active().await.unwrap();
        assert_eq!(drain(&mut opened), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_window_closes_once_and_stops_ticks() {
        let h = Harness::start();
        let mut closed = h.bridge.add_listener(EventName::Closed);
        let mut ticks = h.bridge.add_listener(EventName::TimeUpdated);

        let player = SimulatedPlayer::builder().duration(120.0).playing(true).build();
        let window = player_window(&player, true);
        h.show(&window);
        tokio::time::sleep(Duration::from_millis(1200)).await;

        h.hide(&window);
        h.hide(&window);

        assert_eq!(closed.recv().await, Some(BridgeEvent::Closed));
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: false }));
        assert_eq!(drain(&mut closed), 0);
        assert!(drain(&mut ticks) >= 1);
        assert_eq!(player.observer_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(drain(&mut ticks), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_hidden_window_is_ignored() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);
        let mut closed = h.bridge.add_listener(EventName::Closed);

        let tracked = player_window(&example_player(), true);
        let foreign = player_window(&example_player(), false);
        h.show(&tracked);
        opened.recv().await.unwrap();

        h.hide(&foreign);
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: true }));
        assert_eq!(drain(&mut closed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn surface_losing_its_player_still_closes_on_hide() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);
        let mut closed = h.bridge.add_listener(EventName::Closed);

        let surface = SimulatedController::with_player(example_player());
        let window = SimulatedWindow::new(Some(surface.clone()), true);
        h.show(&window);
        opened.recv().await.unwrap();

        surface.set_player(None);
        h.hide(&window);
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: false }));
        assert_eq!(closed.try_recv(), Some(BridgeEvent::Closed));

        h.show(&player_window(&example_player(), true));
        assert!(opened.recv().await.is_some());
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: true }));
    }

    #[tokio::test(start_paused = true)]
    async fn activations_alternate_strictly() {
        let h = Harness::start();
        let events = h.bridge.add_global_listener();

        let window = player_window(&example_player(), true);
        for _ in 0..3 {
            h.show(&window);
            h.show(&window);
            h.hide(&window);
            h.hide(&window);
        }
        h.bridge.is_active().await.unwrap();
        h.bridge.remove_all_listeners();

        let names: Vec<EventName> = events
            .map(|event| event.name())
            .filter(|name| future::ready(*name != EventName::TimeUpdated))
            .collect()
            .await;
        assert_eq!(
            names,
            [
                EventName::Opened,
                EventName::Closed,
                EventName::Opened,
                EventName::Closed,
                EventName::Opened,
                EventName::Closed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn active_flag_is_monitored() {
        let h = Harness::start();
        let mut active = h.bridge.active_monitored();
        assert_eq!(active.next().await, Some(false));

        let window = player_window(&example_player(), true);
        h.show(&window);
        assert_eq!(active.next().await, Some(true));

        h.hide(&window);
        assert_eq!(active.next().await, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_active_player() {
        let h = Harness::start();
        let mut closed = h.bridge.add_listener(EventName::Closed);

        let player = example_player();
        h.show(&player_window(&player, true));
        h.bridge.is_active().await.unwrap();

        h.bridge.shutdown().await;
        h.bridge.shutdown().await;

        assert_eq!(closed.try_recv(), Some(BridgeEvent::Closed));
        assert_eq!(player.observer_count(), 0);
        assert_eq!(h.bridge.play().await, Err(BridgeError::Unavailable));
    }
}

mod cadence {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn time_updates_every_half_second() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);
        let mut closed = h.bridge.add_listener(EventName::Closed);
        let mut ticks = h.bridge.add_listener(EventName::TimeUpdated);

        let player = SimulatedPlayer::builder().duration(120.0).playing(true).build();
        let window = player_window(&player, true);
        h.show(&window);
        opened.recv().await.unwrap();

        tokio::time::sleep(Duration::from_millis(3000)).await;
        h.hide(&window);
        closed.recv().await.unwrap();

        let count = drain(&mut ticks);
        assert!((5..=7).contains(&count), "got {count} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn time_update_reports_position_and_duration() {
        let h = Harness::start();
        let mut ticks = h.bridge.add_listener(EventName::TimeUpdated);

        let player = SimulatedPlayer::builder()
            .duration(120.0)
            .current_time(10.0)
            .playing(true)
            .build();
        h.show(&player_window(&player, true));

        let Some(BridgeEvent::TimeUpdated(update)) = ticks.recv().await else {
            panic!("expected timeUpdated");
        };
        assert!((update.current_time - 10.5).abs() < 0.01);
        assert_eq!(update.duration, Some(120.0));
    }

    #[tokio::test(start_paused = true)]
    async fn native_rate_change_emits_state_changed() {
        let h = Harness::start();
        let mut changes = h.bridge.add_listener(EventName::StateChanged);

        let player = example_player();
        h.show(&player_window(&player, true));
        h.bridge.is_active().await.unwrap();

        player.play();
        let Some(BridgeEvent::StateChanged(state)) = changes.recv().await else {
            panic!("expected stateChanged");
        };
        assert!(state.is_playing);

        h.bridge.pause().await.unwrap();
        let Some(BridgeEvent::StateChanged(state)) = changes.recv().await else {
            panic!("expected stateChanged");
        };
        assert!(!state.is_playing);
    }
}

mod commands {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_commands_reject_with_no_active_player() {
        let h = Harness::start();

        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: false }));
        assert_eq!(h.bridge.play().await, Err(BridgeError::NoActivePlayer));
        assert_eq!(h.bridge.pause().await, Err(BridgeError::NoActivePlayer));
        assert_eq!(h.bridge.get_state().await, Err(BridgeError::NoActivePlayer));
        assert_eq!(
            h.bridge.seek(SeekOptions::at(5.0)).await,
            Err(BridgeError::NoActivePlayer)
        );
        assert_eq!(
            h.bridge.set_volume(VolumeOptions::level(0.5)).await,
            Err(BridgeError::NoActivePlayer)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn get_state_then_seek() {
        let h = Harness::start();
        h.show(&player_window(&example_player(), true));

        assert_eq!(
            h.bridge.get_state().await,
            Ok(PlaybackState {
                is_playing: false,
                current_time: 10.0,
                duration: Some(120.0),
            })
        );

        h.bridge.seek(SeekOptions::at(30.0)).await.unwrap();
        let state = h.bridge.get_state().await.unwrap();
        assert!((state.current_time - 30.0).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_arguments_reject() {
        let h = Harness::start();
        h.show(&player_window(&example_player(), true));

        let err = dispatch(&h.bridge, "seek", &json!({})).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { ref arg, .. } if arg == "time"));

        let err = dispatch(&h.bridge, "setVolume", &json!({ "volume": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { ref arg, .. } if arg == "volume"));

        assert!(h.bridge.is_active().await.unwrap().active);
    }

    #[tokio::test(start_paused = true)]
    async fn set_volume_applies_clamped_level() {
        let h = Harness::start();
        let player = example_player();
        h.show(&player_window(&player, true));

        h.bridge.set_volume(VolumeOptions::level(0.3)).await.unwrap();
        assert!((player.volume() - 0.3).abs() < f32::EPSILON);

        h.bridge.set_volume(VolumeOptions::level(7.0)).await.unwrap();
        assert_eq!(player.volume(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn later_seek_interrupts_earlier_one() {
        let h = Harness::start();
        let player = SimulatedPlayer::builder()
            .duration(120.0)
            .seek_latency(Duration::from_millis(200))
            .build();
        h.show(&player_window(&player, true));

        let first = {
            let bridge = h.bridge.clone();
            tokio::spawn(async move { bridge.seek(SeekOptions::at(30.0)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = h.bridge.seek(SeekOptions::at(60.0)).await;

        assert_eq!(first.await.unwrap(), Err(BridgeError::SeekInterrupted));
        assert_eq!(second, Ok(()));
        assert_eq!(player.current_time(), 60.0);
    }

    #[tokio::test(start_paused = true)]
    async fn removing_listeners_keeps_commands_working() {
        let h = Harness::start();
        let first = h.bridge.add_listener(EventName::Opened);
        let mut second = h.bridge.add_listener(EventName::Opened);

        first.remove();
        h.show(&player_window(&example_player(), true));
        assert!(second.recv().await.is_some());

        h.bridge.remove_all_listeners();
        h.bridge.remove_all_listeners();
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: true }));
        assert!(h.bridge.get_state().await.is_ok());
    }
}

mod detection {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn item_change_detects_key_window_after_debounce() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);

        h.host.add_window(player_window(&example_player(), true));
        let posted = Instant::now();
        h.signals.post(Notification::item_became_current());

        opened.recv().await.unwrap();
        assert!(posted.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn item_change_ignores_non_key_windows() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);

        h.host.add_window(player_window(&example_player(), false));
        h.signals.post(Notification::item_became_current());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: false }));
        assert!(opened.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn observing_toggles_are_idempotent() {
        let h = Harness::start();
        let mut opened = h.bridge.add_listener(EventName::Opened);
        let window = player_window(&example_player(), true);

        h.bridge.stop_observing();
        h.bridge.stop_observing();
        assert!(!h.bridge.is_observing());

        h.show(&window);
        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: false }));

        h.bridge.start_observing();
        h.bridge.start_observing();
        assert!(h.bridge.is_observing());

        h.show(&window);
        h.bridge.is_active().await.unwrap();
        assert_eq!(drain(&mut opened), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_cancels_pending_item_check() {
        let h = Harness::start();
        h.host.add_window(player_window(&example_player(), true));

        h.signals.post(Notification::item_became_current());
        h.bridge.stop_observing();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.bridge.is_active().await, Ok(ActiveStatus { active: false }));
    }
}

mod fallback {
    use super::*;

    #[tokio::test]
    async fn every_command_is_unsupported() {
        let bridge = UnsupportedVideoBridge::new();

        assert_eq!(bridge.is_active().await, Err(BridgeError::Unsupported));
        assert_eq!(bridge.get_state().await, Err(BridgeError::Unsupported));
        assert_eq!(bridge.play().await, Err(BridgeError::Unsupported));
        assert_eq!(bridge.pause().await, Err(BridgeError::Unsupported));
        assert_eq!(
            bridge.seek(SeekOptions::at(1.0)).await,
            Err(BridgeError::Unsupported)
        );
        assert_eq!(
            bridge.set_volume(VolumeOptions::level(1.0)).await,
            Err(BridgeError::Unsupported)
        );
    }

    #[tokio::test]
    async fn listeners_never_fire() {
        let bridge = UnsupportedVideoBridge::new();
        let mut opened = bridge.add_listener(EventName::Opened);

        assert!(opened.try_recv().is_none());
        bridge.remove_all_listeners();
        bridge.remove_all_listeners();
        assert!(opened.recv().await.is_none());
    }
}
