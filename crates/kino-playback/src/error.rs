//! Error types for Kino Playback

use thiserror::Error;

/// Result type alias for playback controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Playback controller error types
///
/// None of these escape [`crate::PlaybackController`]'s public surface; they
/// travel between internal steps and are logged where they are absorbed.
#[derive(Error, Debug)]
pub enum Error {
    // Media sink errors
    #[error("Playback rejected by media sink: {0}")]
    PlaybackRejected(String),

    // Session errors
    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("No live session")]
    NoActiveSession,

    #[error("Reinitialization limit reached after {attempts} attempts")]
    ReinitLimitReached { attempts: u32 },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a playback rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Error::PlaybackRejected(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PlaybackRejected(_) | Error::NoActiveSession)
    }

    /// Returns the error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlaybackRejected(_) => "PLAYBACK_REJECTED",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::NoActiveSession => "NO_SESSION",
            Error::ReinitLimitReached { .. } => "REINIT_LIMIT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Internal(_) => "INTERNAL",
        }
    }
}
