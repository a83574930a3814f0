//! Shared playback options
//!
//! One writer (the controller) and any number of readers (menus, overlays).
//! Every write replaces the whole snapshot, built from the previous one, so a
//! reader never sees a half-updated ladder.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Quality ladder as offered to viewers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackOptions {
    /// Distinct video heights, tallest first
    pub qualities: Vec<u32>,
    /// Height the controller is steering toward; unset until the first manifest parse
    pub current_quality: Option<u32>,
}

/// Cloneable handle onto the shared options
#[derive(Debug, Clone)]
pub struct PlaybackOptionsHandle {
    tx: Arc<watch::Sender<PlaybackOptions>>,
}

impl PlaybackOptionsHandle {
    pub fn new() -> Self {
        Self::with_options(PlaybackOptions::default())
    }

    pub fn with_options(options: PlaybackOptions) -> Self {
        let (tx, _) = watch::channel(options);
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PlaybackOptions {
        self.tx.borrow().clone()
    }

    /// Watch for replacements
    pub fn subscribe(&self) -> watch::Receiver<PlaybackOptions> {
        self.tx.subscribe()
    }

    /// Replace the snapshot with one derived from the previous value
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&PlaybackOptions) -> PlaybackOptions,
    {
        let next = {
            let prev = self.tx.borrow();
            f(&prev)
        };
        self.tx.send_replace(next);
    }

    /// Viewer-initiated quality choice; `None` hands control back to the engine
    pub fn request_quality(&self, height: Option<u32>) {
        self.update(|prev| PlaybackOptions {
            current_quality: height,
            ..prev.clone()
        });
    }

    /// Whether both handles write the same shared state
    pub fn same_channel(&self, other: &PlaybackOptionsHandle) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl Default for PlaybackOptionsHandle {
    fn default() -> Self {
        Self::new()
    }
}
