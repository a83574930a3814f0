//! Seams to the external stream engine and media sink
//!
//! The controller never parses manifests or fetches segments itself. It drives
//! a [`StreamEngine`] through commands and reacts to the [`EngineEvent`]s the
//! engine pushes back through its [`EngineEventSender`].

use crate::{config::EngineConfig, Level, LevelSelection, Result, SessionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Native media playback primitive
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Start playback; platforms may refuse before a user gesture
    async fn play(&self) -> Result<()>;

    /// Pause playback
    fn pause(&self);

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    /// Move the playback position
    fn set_current_time(&self, seconds: f64);

    /// Whether playback is paused
    fn paused(&self) -> bool;

    /// Direct source assignment (non-adaptive path only)
    fn set_src(&self, src: &str);

    /// Direct autoplay assignment (non-adaptive path only)
    fn set_autoplay(&self, autoplay: bool);
}

/// Adaptive streaming engine bound to one media sink
pub trait StreamEngine: Send {
    /// Bind to the media sink; answers with [`EngineEvent::MediaAttached`]
    fn attach_media(&mut self, sink: Arc<dyn MediaSink>);

    /// Fetch the manifest; answers with [`EngineEvent::ManifestParsed`]
    fn load_source(&mut self, url: &str);

    /// Restart segment loading from the current position
    fn start_load(&mut self);

    /// Try to heal a decoder fault in place
    fn recover_media_error(&mut self);

    /// Bitrate ladder in the engine's own order
    fn levels(&self) -> Vec<Level>;

    /// Active level
    fn current_level(&self) -> LevelSelection;

    /// Switch the active level
    fn set_current_level(&mut self, selection: LevelSelection);

    /// Release network and buffer resources and detach from the sink
    fn destroy(&mut self);
}

/// Builds engine instances
pub trait EngineFactory: Send + Sync {
    /// Capability check for the current environment
    fn is_supported(&self) -> bool;

    /// Construct a fresh engine that reports through `events`
    fn create(&self, config: EngineConfig, events: EngineEventSender) -> Box<dyn StreamEngine>;
}

/// Engine error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Network,
    Media,
    KeySystem,
    Mux,
    Other,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorType::Network => write!(f, "networkError"),
            ErrorType::Media => write!(f, "mediaError"),
            ErrorType::KeySystem => write!(f, "keySystemError"),
            ErrorType::Mux => write!(f, "muxError"),
            ErrorType::Other => write!(f, "otherError"),
        }
    }
}

/// Error payload reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineErrorData {
    pub error_type: ErrorType,
    /// Engine-specific detail code, e.g. `manifestLoadError`
    pub details: String,
    pub fatal: bool,
}

impl EngineErrorData {
    pub fn fatal(error_type: ErrorType, details: impl Into<String>) -> Self {
        Self {
            error_type,
            details: details.into(),
            fatal: true,
        }
    }

    pub fn non_fatal(error_type: ErrorType, details: impl Into<String>) -> Self {
        Self {
            error_type,
            details: details.into(),
            fatal: false,
        }
    }
}

/// Lifecycle and error notifications from the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    MediaAttached,
    ManifestParsed,
    Error(EngineErrorData),
}

/// Engine event stamped with the session that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: EngineEvent,
}

/// Event channel handed to each engine at construction
///
/// Sending is synchronous and never fails from the engine's point of view;
/// events sent after the controller is gone are dropped.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EngineEventSender {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    /// Session this sender reports for
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Push an event to the controller
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(SessionEvent {
            session: self.session,
            event,
        });
    }
}

/// Whether a source URL points at an adaptive (HLS) manifest.
///
/// Any `m3u8` in the source counts, wherever it appears: host, path, query
/// or fragment. Relative or otherwise unparseable sources are checked as given.
pub fn is_adaptive_source(src: &str) -> bool {
    let normalized = match Url::parse(src) {
        Ok(url) => url.as_str().to_lowercase(),
        Err(_) => src.to_lowercase(),
    };
    normalized.contains("m3u8")
}
