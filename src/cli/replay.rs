//! Drives a bridge through a [`Scenario`] and records what the web layer would see.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::{sync::mpsc, time::sleep};
use tracing::{info, instrument};

use super::scenario::{Scenario, SimulatedWorld, Step};
use crate::{
    Result,
    config::Config,
    services::video::{
        BridgeError, BridgeEvent, EventSubscription, NativeVideoBridge, UnsupportedVideoBridge,
        VideoBridge, dispatch,
        host::NativePlayer,
        signals::{Notification, SignalCenter},
    },
};

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayRecord {
    /// Wall-clock time the record was produced, RFC 3339
    pub at: String,

    /// What happened
    #[serde(flatten)]
    pub entry: ReplayEntry,
}

/// Observable outcome during a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayEntry {
    /// An outward bridge event
    Event {
        /// Wire name of the event
        name: String,
        /// Event payload
        payload: Value,
    },

    /// A command and how it settled
    Command {
        /// Method name
        method: String,
        /// Resolved value, absent when rejected
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Rejection, absent when resolved
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
}

impl ReplayEntry {
    fn event(event: &BridgeEvent) -> Self {
        Self::Event {
            name: event.name().to_string(),
            payload: event.payload(),
        }
    }

    fn command(method: &str, outcome: std::result::Result<Value, BridgeError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(e) => (
                None,
                Some(json!({ "code": e.code(), "message": e.to_string() })),
            ),
        };
        Self::Command {
            method: method.to_string(),
            result,
            error,
        }
    }
}

impl ReplayRecord {
    fn now(entry: ReplayEntry) -> Self {
        Self {
            at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entry,
        }
    }
}

enum ReplayBridge {
    Native(NativeVideoBridge),
    Unsupported(UnsupportedVideoBridge),
}

impl ReplayBridge {
    fn as_dyn(&self) -> &dyn VideoBridge {
        match self {
            Self::Native(bridge) => bridge,
            Self::Unsupported(bridge) => bridge,
        }
    }
}

/// Runs `scenario` against a bridge configured by `config`.
///
/// Every event and command outcome is sent to `records` in the order it
/// happened. A disabled bridge replays against the unsupported fallback.
///
/// # Errors
///
/// Returns an error if the scenario refers to undeclared players or
/// windows, or the bridge configuration is invalid.
#[instrument(skip_all, fields(steps = scenario.steps.len()))]
pub async fn run(
    scenario: &Scenario,
    config: &Config,
    records: mpsc::UnboundedSender<ReplayRecord>,
) -> Result<()> {
    let world = scenario.build()?;
    let signals = SignalCenter::new();

    let bridge = if config.bridge.enabled {
        let settings = config.bridge.settings()?;
        ReplayBridge::Native(NativeVideoBridge::start(
            world.host.clone(),
            signals.clone(),
            settings,
        ))
    } else {
        info!("Bridge disabled, replaying against the unsupported fallback");
        ReplayBridge::Unsupported(UnsupportedVideoBridge::new())
    };

    let mut recorder = Recorder {
        events: bridge.as_dyn().add_global_listener(),
        records,
    };

    let outcome = execute_steps(scenario, &world, &signals, &bridge, &mut recorder).await;

    if let ReplayBridge::Native(native) = &bridge {
        native.shutdown().await;
    }
    bridge.as_dyn().remove_all_listeners();
    while let Some(event) = recorder.events.recv().await {
        recorder.event(&event);
    }

    outcome
}

/// Single writer for replay records.
///
/// Events queued before a command settles are written before its outcome.
struct Recorder {
    events: EventSubscription,
    records: mpsc::UnboundedSender<ReplayRecord>,
}

impl Recorder {
    fn event(&self, event: &BridgeEvent) {
        let _ = self.records.send(ReplayRecord::now(ReplayEntry::event(event)));
    }

    fn drain(&mut self) {
        while let Some(event) = self.events.try_recv() {
            self.event(&event);
        }
    }

    fn command(&mut self, method: &str, outcome: std::result::Result<Value, BridgeError>) {
        self.drain();
        let _ = self
            .records
            .send(ReplayRecord::now(ReplayEntry::command(method, outcome)));
    }

    async fn wait(&mut self, duration: Duration) {
        let deadline = sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => break,
                Some(event) = self.events.recv() => self.event(&event),
            }
        }
    }
}

async fn execute_steps(
    scenario: &Scenario,
    world: &SimulatedWorld,
    signals: &SignalCenter,
    bridge: &ReplayBridge,
    recorder: &mut Recorder,
) -> Result<()> {
    for step in &scenario.steps {
        recorder.drain();
        match step {
            Step::WindowVisible { window } => {
                signals.post(Notification::window_visible(world.window(window)?.clone()));
            }
            Step::WindowHidden { window } => {
                signals.post(Notification::window_hidden(world.window(window)?.clone()));
            }
            Step::ItemChanged => signals.post(Notification::item_became_current()),
            Step::SetKey { window, key } => world.window(window)?.set_key(*key),
            Step::Dismiss { window } => world.window(window)?.set_root(None),
            Step::PlayerPlay { player } => world.player(player)?.play(),
            Step::PlayerPause { player } => world.player(player)?.pause(),
            Step::DetachPlayer { player } => world.detach_player(player)?,
            Step::Wait { ms } => recorder.wait(Duration::from_millis(*ms)).await,
            Step::Command { method, args } => {
                let outcome = dispatch(bridge.as_dyn(), method, args).await;
                recorder.command(method, outcome);
            }
            Step::StopObserving => {
                if let ReplayBridge::Native(native) = bridge {
                    native.stop_observing();
                }
            }
            Step::StartObserving => {
                if let ReplayBridge::Native(native) = bridge {
                    native.start_observing();
                }
            }
        }
    }
    Ok(())
}
