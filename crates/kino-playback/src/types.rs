//! Core types for Kino Playback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a controller session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry in the bitrate ladder reported by the stream engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    /// Pixel rows; `None` or zero for audio-only or unknown renditions
    pub height: Option<u32>,
    /// Bits per second
    pub bitrate: u64,
}

impl Level {
    pub fn new(height: u32, bitrate: u64) -> Self {
        Self {
            height: Some(height),
            bitrate,
        }
    }

    /// Audio-only or otherwise height-less rendition
    pub fn audio_only(bitrate: u64) -> Self {
        Self {
            height: None,
            bitrate,
        }
    }

    /// Height if this rendition carries video rows
    pub fn video_height(&self) -> Option<u32> {
        self.height.filter(|h| *h > 0)
    }
}

/// Active-level command sent to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelSelection {
    /// Let the engine's own ABR pick
    Auto,
    /// Pin the engine to this position in its bitrate-descending ladder
    Index(usize),
}

impl LevelSelection {
    /// Engine-style numeric index, `-1` meaning auto
    pub fn as_engine_index(&self) -> i64 {
        match self {
            LevelSelection::Auto => -1,
            LevelSelection::Index(i) => *i as i64,
        }
    }
}

impl std::fmt::Display for LevelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelSelection::Auto => write!(f, "auto"),
            LevelSelection::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Session created, nothing bound yet
    Idle,
    /// Engine constructed and binding to the media sink
    Attaching,
    /// Media attached, manifest requested
    ManifestLoading,
    /// Manifest parsed (or direct playback assigned)
    Ready,
    /// Session gave up recovering
    Error,
    /// Engine torn down
    Destroyed,
}

impl SessionState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            // From Idle (Ready is the direct-assignment path)
            (Idle, Attaching) | (Idle, Ready) | (Idle, Destroyed) |
            // From Attaching
            (Attaching, ManifestLoading) | (Attaching, Error) | (Attaching, Destroyed) |
            // From ManifestLoading
            (ManifestLoading, Ready) | (ManifestLoading, Error) | (ManifestLoading, Destroyed) |
            // From Ready
            (Ready, Error) | (Ready, Destroyed) |
            // From Error
            (Error, Destroyed)
        )
    }

    /// Attached, loading, or playing
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionState::Error | SessionState::Destroyed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Attaching => write!(f, "attaching"),
            SessionState::ManifestLoading => write!(f, "manifest_loading"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Error => write!(f, "error"),
            SessionState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// How a session plays its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Stream engine bound to the sink
    Adaptive,
    /// URL assigned straight onto the sink
    Direct,
}

/// Snapshot of the current session for observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub mode: PlaybackMode,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    /// Number of sessions created by this controller, this one included
    pub generation: u64,
}

/// Media element notifications feeding [`PlaybackState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    Play,
    Playing,
    Pause,
    Waiting,
    CanPlay,
    Seeking,
    Seeked,
    Ended,
}

/// Read-only playback flags consumed by the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub buffering: bool,
    pub paused: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            buffering: false,
            paused: true,
        }
    }
}

impl PlaybackState {
    /// Fold a media event into the flags
    pub fn apply(self, event: MediaEvent) -> Self {
        match event {
            MediaEvent::Play => Self { paused: false, ..self },
            MediaEvent::Playing => Self {
                buffering: false,
                paused: false,
            },
            MediaEvent::Pause => Self { paused: true, ..self },
            MediaEvent::Waiting | MediaEvent::Seeking => Self {
                buffering: true,
                ..self
            },
            MediaEvent::CanPlay | MediaEvent::Seeked => Self {
                buffering: false,
                ..self
            },
            MediaEvent::Ended => Self {
                buffering: false,
                paused: true,
            },
        }
    }
}
