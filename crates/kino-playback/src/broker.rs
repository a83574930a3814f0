//! Process-wide controls visibility signals
//!
//! The player chrome announces when its controls appear and disappear; the
//! overlay and anything else interested subscribes. Signals carry no payload
//! and are only delivered to subscribers that existed when they were sent.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 32;

static GLOBAL: OnceLock<VisibilityBroker> = OnceLock::new();

/// Controls visibility signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlsSignal {
    #[serde(rename = "controls-shown")]
    Shown,
    #[serde(rename = "controls-hidden")]
    Hidden,
}

impl ControlsSignal {
    /// Wire name of the signal
    pub fn name(&self) -> &'static str {
        match self {
            ControlsSignal::Shown => "controls-shown",
            ControlsSignal::Hidden => "controls-hidden",
        }
    }

    /// Look a signal up by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "controls-shown" => Some(ControlsSignal::Shown),
            "controls-hidden" => Some(ControlsSignal::Hidden),
            _ => None,
        }
    }
}

impl std::fmt::Display for ControlsSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Broadcast channel for [`ControlsSignal`]s
#[derive(Clone, Debug)]
pub struct VisibilityBroker {
    tx: broadcast::Sender<ControlsSignal>,
}

impl VisibilityBroker {
    /// Create a standalone broker with the given channel capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// The application-wide broker
    pub fn global() -> &'static VisibilityBroker {
        GLOBAL.get_or_init(|| VisibilityBroker::new(DEFAULT_CAPACITY))
    }

    /// Send a signal to every current subscriber; returns how many there were.
    ///
    /// Sending with nobody listening is not an error.
    pub fn publish(&self, signal: ControlsSignal) -> usize {
        let delivered = self.tx.send(signal).unwrap_or(0);
        debug!(signal = %signal, subscribers = delivered, "Controls signal published");
        delivered
    }

    /// Receive every signal sent from now on
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Live subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for VisibilityBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One subscriber's view of the broker. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ControlsSignal>,
}

impl Subscription {
    /// Wait for the next signal; `None` once the broker is gone
    pub async fn recv(&mut self) -> Option<ControlsSignal> {
        loop {
            match self.rx.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscriber lagged, skipping to newest signals");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next queued signal without waiting
    pub fn try_recv(&mut self) -> Option<ControlsSignal> {
        loop {
            match self.rx.try_recv() {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscriber lagged, skipping to newest signals");
                }
                Err(_) => return None,
            }
        }
    }

    /// Stop receiving signals
    pub fn unsubscribe(self) {}
}
