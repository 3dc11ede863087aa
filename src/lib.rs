//! Native video bridge.
//!
//! Detects when the host application presents a native, OS-level video
//! player outside an embedded web view, and bridges that player to web
//! content: commands go in, playback events come out.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use native_video_bridge::services::video::{
//!     EventName, NativeVideoBridge, Settings, VideoBridge,
//!     signals::SignalCenter, simulated::SimulatedHost,
//! };
//!
//! # async fn demo() {
//! let signals = SignalCenter::new();
//! let bridge = NativeVideoBridge::start(SimulatedHost::new(), signals.clone(), Settings::default());
//!
//! let mut opened = bridge.add_listener(EventName::Opened);
//! if let Some(event) = opened.recv().await {
//!     println!("{}", event.payload());
//! }
//! # }
//! ```

/// Configuration schema definitions and loading.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Command-line interface.
pub mod cli;

/// Bridge services and their building blocks.
pub mod services;

/// Tracing subscriber setup.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use core::{AppError, Result};
