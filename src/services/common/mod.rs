//! Building blocks shared by services

/// Watchable state cells
pub mod property;

pub use property::Property;
