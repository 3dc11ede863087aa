//! Native video player bridge.
//!
//! Detects a native player surface presented by the host application,
//! bridges commands to it and publishes its playback events to the web
//! layer.

mod controller;
mod dispatch;
/// Video bridge error types
pub mod error;
/// Outward event channel
pub mod events;
/// Seams to the host UI and native player
pub mod host;
/// Player surface search over a view-controller tree
pub mod hierarchy;
mod observer;
/// Command argument decoding
pub mod options;
mod runtime;
/// Bridge implementations and the command trait
pub mod service;
/// Ambient host notifications
pub mod signals;
/// In-memory host used by the replay CLI and tests
pub mod simulated;
/// Playback snapshot types
pub mod types;

pub use dispatch::{METHODS, dispatch};
pub use error::*;
pub use events::*;
pub use options::*;
pub use service::*;
pub use types::*;
