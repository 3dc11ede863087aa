/// Shared service building blocks
pub mod common;
/// Native video player bridge
pub mod video;

pub use video::{NativeVideoBridge, UnsupportedVideoBridge, VideoBridge};
