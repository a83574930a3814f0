//! Kino Playback - Adaptive stream lifecycle controller for Kino
//!
//! This crate owns the relationship between an adaptive streaming engine and
//! the media element it feeds:
//! - Session initialization (attach -> load -> manifest parsed)
//! - Direct-assignment fallback for non-adaptive sources
//! - Quality ladder publication and viewer quality requests
//! - Fatal error classification and recovery
//! - Teardown on reconfiguration and unmount
//! - Controls visibility signals and the playback control surface
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Kino Playback                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐   commands    ┌──────────────┐               │
//! │  │   Playback   │──────────────▶│    Stream    │               │
//! │  │  Controller  │◀──────────────│    Engine    │               │
//! │  └──────┬───────┘ session events└──────┬───────┘               │
//! │         │                              │ attach                 │
//! │         │ options            ┌─────────┴────┐                   │
//! │         ▼                    │  Media Sink  │                   │
//! │  ┌──────────────┐            └─────────┬────┘                   │
//! │  │   Playback   │                      │ play/pause/seek        │
//! │  │   Options    │◀──────────┐ ┌────────┴─────┐                  │
//! │  └──────────────┘  quality  └─│   Control    │                  │
//! │                               │   Surface    │                  │
//! │  ┌──────────────┐  signals    └──────────────┘                  │
//! │  │  Visibility  │───────────▶ Overlay                           │
//! │  │    Broker    │                                               │
//! │  └──────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod engine;
pub mod quality;
pub mod recovery;
pub mod options;
pub mod controller;
pub mod broker;
pub mod controls;
#[cfg(feature = "sim")]
pub mod sim;

pub use error::{Error, Result};
pub use types::*;
pub use config::{ControllerConfig, ControlsConfig, EngineConfig, PlayerProps};
pub use engine::{
    is_adaptive_source, EngineErrorData, EngineEvent, EngineEventSender, EngineFactory, ErrorType,
    MediaSink, SessionEvent, StreamEngine,
};
pub use quality::{derive_qualities, quality_label, resolve_level};
pub use recovery::RecoveryAction;
pub use options::{PlaybackOptions, PlaybackOptionsHandle};
pub use controller::PlaybackController;
pub use broker::{ControlsSignal, Subscription, VisibilityBroker};
pub use controls::{CenterButton, ControlAction, ControlSurface, Overlay, QualityEntry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Kino Playback initialized");
}
