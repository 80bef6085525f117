//! Session event stream.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that a presentation layer attaching late can
//! still render the last few state changes.
//!
//! Events for one job are published in order: every `JobProgress` for a job is
//! broadcast before that job's `JobCompleted`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::{ArtifactHandle, BatchId, SourceId};
use crate::media::GenerationMode;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Payload describing what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- Engine lifecycle ----------------------------------------------------
    EngineLoading {
        engine: String,
    },
    EngineReady {
        engine: String,
    },
    EngineFailed {
        error: String,
    },

    // -- Source ---------------------------------------------------------------
    SourceLoaded {
        source_id: SourceId,
        name: String,
        size_bytes: u64,
    },
    DurationReported {
        source_id: SourceId,
        duration_secs: f64,
    },

    // -- Batch lifecycle -----------------------------------------------------
    BatchStarted {
        batch_id: BatchId,
        mode: GenerationMode,
        planned: usize,
    },
    JobStarted {
        batch_id: BatchId,
        index: usize,
        total: usize,
        start_secs: f64,
        duration_secs: f64,
    },
    JobProgress {
        batch_id: BatchId,
        index: usize,
        percent: u8,
    },
    JobSkipped {
        batch_id: BatchId,
        index: usize,
        duration_secs: f64,
    },
    JobCompleted {
        batch_id: BatchId,
        index: usize,
        handle: ArtifactHandle,
        filename: String,
        size_bytes: u64,
    },
    BatchCompleted {
        batch_id: BatchId,
        artifacts: usize,
    },
    BatchFailed {
        batch_id: BatchId,
        error: String,
    },
    /// A batch outlived a reset; its late results were thrown away.
    BatchDiscarded {
        batch_id: BatchId,
    },
    SessionReset {
        released: usize,
    },
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn publish(&self, payload: EventPayload) {
        let event = Event::new(payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.tx.receiver_count())
            .field("recent", &self.recent.read().len())
            .finish()
    }
}
