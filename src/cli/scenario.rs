//! Replay scenario files.
//!
//! A scenario declares simulated players, host windows with their
//! view-controller trees, and a timeline of steps to drive a bridge with.

use std::{collections::HashMap, fs, path::Path, sync::Arc, time::Duration};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    AppError, Result,
    services::video::{
        host::ControllerRef,
        simulated::{SimulatedController, SimulatedHost, SimulatedPlayer, SimulatedWindow},
    },
};

/// A complete scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Players available to controller trees
    #[serde(default)]
    pub players: Vec<PlayerSpec>,

    /// Host windows, bottom to top
    #[serde(default)]
    pub windows: Vec<WindowSpec>,

    /// Timeline executed in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Initial state of a simulated player.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSpec {
    /// Name steps and controller nodes refer to
    pub id: String,

    /// Asset URL
    pub url: Option<String>,

    /// Item duration in seconds
    pub duration: Option<f64>,

    /// Starting position in seconds
    #[serde(default)]
    pub current_time: f64,

    /// Whether playback starts immediately
    #[serde(default)]
    pub playing: bool,

    /// Time a seek takes to settle, in milliseconds
    #[serde(default)]
    pub seek_latency_ms: u64,
}

/// A host window.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowSpec {
    /// Name steps refer to
    pub id: String,

    /// Whether the window is the key window
    #[serde(default)]
    pub key: bool,

    /// Root of the window's view-controller tree
    pub root: Option<ControllerSpec>,
}

/// A node of a view-controller tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerSpec {
    /// Player id when the node is a native player surface
    pub player: Option<String>,

    /// Marks a native player surface that starts without a player
    #[serde(default)]
    pub surface: bool,

    /// Controller presented on top of this one
    pub presented: Option<Box<ControllerSpec>>,

    /// Child controllers in order
    #[serde(default)]
    pub children: Vec<ControllerSpec>,
}

/// One timeline entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Post a window-became-visible notification
    WindowVisible {
        /// Window id
        window: String,
    },

    /// Post a window-became-hidden notification
    WindowHidden {
        /// Window id
        window: String,
    },

    /// Post a player-item-became-current notification
    ItemChanged,

    /// Change which window is key
    SetKey {
        /// Window id
        window: String,
        /// New key state
        key: bool,
    },

    /// Remove the window's root controller without any notification
    Dismiss {
        /// Window id
        window: String,
    },

    /// Start playback from the native UI
    PlayerPlay {
        /// Player id
        player: String,
    },

    /// Pause playback from the native UI
    PlayerPause {
        /// Player id
        player: String,
    },

    /// Detach a player from every surface presenting it
    DetachPlayer {
        /// Player id
        player: String,
    },

    /// Let time pass
    Wait {
        /// Milliseconds to wait
        ms: u64,
    },

    /// Issue a bridge command by name
    Command {
        /// Method name as accepted by the dispatcher
        method: String,
        /// Arguments object
        #[serde(default)]
        args: Value,
    },

    /// Stop delivering host signals to the bridge
    StopObserving,

    /// Resume delivering host signals to the bridge
    StartObserving,
}

impl Scenario {
    /// Reads a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid scenario.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AppError::io(e, path))?;
        toml::from_str(&content).map_err(|e| AppError::toml_parse(e, Some(path)))
    }

    /// Parses a scenario from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TomlParseError` for malformed input.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::toml_parse(e, None))
    }

    /// Instantiates the simulated host described by this scenario.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Scenario` for duplicate ids or references to
    /// undeclared players.
    pub fn build(&self) -> Result<SimulatedWorld> {
        let mut players = HashMap::new();
        for spec in &self.players {
            let mut builder = SimulatedPlayer::builder()
                .current_time(spec.current_time)
                .playing(spec.playing)
                .seek_latency(Duration::from_millis(spec.seek_latency_ms));
            if let Some(url) = &spec.url {
                builder = builder.url(url.clone());
            }
            if let Some(duration) = spec.duration {
                builder = builder.duration(duration);
            }

            if players.insert(spec.id.clone(), builder.build()).is_some() {
                return Err(AppError::Scenario(format!("duplicate player '{}'", spec.id)));
            }
        }

        let host = SimulatedHost::new();
        let mut windows = HashMap::new();
        let mut surfaces = Vec::new();
        for spec in &self.windows {
            let root = spec
                .root
                .as_ref()
                .map(|root| build_controller(root, &players, &mut surfaces))
                .transpose()?;
            let window = SimulatedWindow::new(root, spec.key);
            host.add_window(window.clone());

            if windows.insert(spec.id.clone(), window).is_some() {
                return Err(AppError::Scenario(format!("duplicate window '{}'", spec.id)));
            }
        }

        Ok(SimulatedWorld {
            host,
            players,
            windows,
            surfaces,
        })
    }
}

fn build_controller(
    spec: &ControllerSpec,
    players: &HashMap<String, Arc<SimulatedPlayer>>,
    surfaces: &mut Vec<(String, Arc<SimulatedController>)>,
) -> Result<ControllerRef> {
    let node = match &spec.player {
        Some(id) => {
            let player = players
                .get(id)
                .ok_or_else(|| AppError::Scenario(format!("unknown player '{id}'")))?;
            let node = SimulatedController::with_player(player.clone());
            surfaces.push((id.clone(), node.clone()));
            node
        }
        None if spec.surface => SimulatedController::surface(),
        None => SimulatedController::plain(),
    };

    if let Some(presented) = &spec.presented {
        node.present(build_controller(presented, players, surfaces)?);
    }
    for child in &spec.children {
        node.add_child(build_controller(child, players, surfaces)?);
    }

    Ok(node)
}

/// Host, players and windows built from a [`Scenario`].
pub struct SimulatedWorld {
    /// The simulated host application
    pub host: Arc<SimulatedHost>,
    players: HashMap<String, Arc<SimulatedPlayer>>,
    windows: HashMap<String, Arc<SimulatedWindow>>,
    surfaces: Vec<(String, Arc<SimulatedController>)>,
}

impl SimulatedWorld {
    /// Looks up a declared player.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Scenario` if `id` was never declared.
    pub fn player(&self, id: &str) -> Result<&Arc<SimulatedPlayer>> {
        self.players
            .get(id)
            .ok_or_else(|| AppError::Scenario(format!("unknown player '{id}'")))
    }

    /// Detaches player `id` from every surface built with it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Scenario` if `id` was never declared.
    pub fn detach_player(&self, id: &str) -> Result<()> {
        self.player(id)?;
        for (_, surface) in self.surfaces.iter().filter(|(player, _)| player == id) {
            surface.set_player(None);
        }
        Ok(())
    }

    /// Looks up a declared window.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Scenario` if `id` was never declared.
    pub fn window(&self, id: &str) -> Result<&Arc<SimulatedWindow>> {
        self.windows
            .get(id)
            .ok_or_else(|| AppError::Scenario(format!("unknown window '{id}'")))
    }
}
