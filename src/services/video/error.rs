/// Errors surfaced to callers of the video bridge command surface.
///
/// None of these are retried by the bridge. The bridge stays usable after
/// any of them.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A command that needs a player was issued while no player is tracked
    #[error("No active player")]
    NoActivePlayer,

    /// A required numeric argument was missing or malformed
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// Name of the offending argument
        arg: String,
        /// Why the argument was rejected
        reason: String,
    },

    /// The native player reported that a seek did not finish
    #[error("Seek was interrupted")]
    SeekInterrupted,

    /// The execution environment has no native player surface concept
    #[error("This plugin is only available on native platforms")]
    Unsupported,

    /// A dispatched method name is not part of the command table
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// The main-context task that owns bridge state is no longer running
    #[error("Video bridge is not running")]
    Unavailable,
}

impl BridgeError {
    /// Creates an `InvalidArgument` error for a missing or non-numeric value.
    pub fn missing_number(arg: &str) -> Self {
        Self::InvalidArgument {
            arg: arg.to_string(),
            reason: format!("{arg} parameter is required and must be a number"),
        }
    }

    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoActivePlayer => "NO_ACTIVE_PLAYER",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::SeekInterrupted => "SEEK_INTERRUPTED",
            Self::Unsupported => "UNIMPLEMENTED",
            Self::UnknownMethod(_) => "UNKNOWN_METHOD",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}
