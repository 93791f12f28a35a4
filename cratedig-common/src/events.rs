//! Engine status types and the StatusBus broadcaster
//!
//! The playback engine communicates with the UI layer exclusively through
//! status values pushed on the bus:
//! - **StatusBus** (tokio::broadcast): one-to-many status broadcasting
//! - Statuses are recomputed on every transition and pushed, never polled
//!   destructively
//!
//! For a given play request the delivery order is
//! `Downloading(non-decreasing)* -> Playing | Failed`, with nothing at all
//! after a cancelled or superseded request.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Engine status pushed to the UI on every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineStatus {
    /// No request in flight, nothing playing
    Idle,

    /// Fetch in progress
    ///
    /// `percent` stays 0 for the whole transfer when the response carries no
    /// `Content-Length` header.
    Downloading {
        /// Progress percent in [0, 100]
        percent: u8,
    },

    /// Output started for the downloaded track
    Playing {
        /// Display label of the track (file name)
        track: String,
    },

    /// Playback halted by an explicit stop
    Stopped,

    /// Request failed; `reason` is rendered verbatim by the UI
    Failed {
        /// Human-readable failure reason
        reason: String,
    },
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineStatus::Idle => write!(f, "Ready"),
            EngineStatus::Downloading { percent } => write!(f, "Downloading {}%", percent),
            EngineStatus::Playing { track } => write!(f, "Playing: {}", track),
            EngineStatus::Stopped => write!(f, "Stopped"),
            EngineStatus::Failed { reason } => write!(f, "Failed: {}", reason),
        }
    }
}

/// Broadcast bus carrying engine statuses to all subscribers
#[derive(Debug)]
pub struct StatusBus {
    tx: broadcast::Sender<EngineStatus>,
    capacity: usize,
}

impl StatusBus {
    /// Creates a new StatusBus with the specified channel capacity
    ///
    /// `capacity` is the number of statuses buffered before old ones are
    /// dropped for a slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future statuses
    ///
    /// Statuses emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineStatus> {
        self.tx.subscribe()
    }

    /// Emit a status to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` when nobody is listening.
    pub fn emit(
        &self,
        status: EngineStatus,
    ) -> std::result::Result<usize, broadcast::error::SendError<EngineStatus>> {
        self.tx.send(status)
    }

    /// Emit a status, ignoring the no-subscribers case
    ///
    /// The engine uses this for all transitions: a UI that has not subscribed
    /// yet simply misses them.
    pub fn emit_lossy(&self, status: EngineStatus) {
        let _ = self.tx.send(status);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
