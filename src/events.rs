//! Ordered event emission.
//!
//! Accepted fixes and state changes share one sink so consumers see a single
//! total order. Events never carry errors; those are returned to the command
//! caller.

use std::sync::mpsc;
use std::sync::Mutex;

use log::warn;
use serde::Serialize;

use crate::{Fix, TrackingState};

/// Event delivered to the application layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackingEvent {
    /// An accepted fix, stamped with its sequence number
    Location { fix: Fix },
    /// A state transition
    State { state: TrackingState },
}

impl TrackingEvent {
    /// Render as `{"type":"location","fix":{...}}` or `{"type":"state","state":"active"}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn as_state(&self) -> Option<TrackingState> {
        match self {
            TrackingEvent::State { state } => Some(*state),
            TrackingEvent::Location { .. } => None,
        }
    }

    pub fn as_fix(&self) -> Option<&Fix> {
        match self {
            TrackingEvent::Location { fix } => Some(fix),
            TrackingEvent::State { .. } => None,
        }
    }
}

/// Receives events in emission order. Must not reorder or drop them.
///
/// Called with the engine lock held, so implementations should hand the event
/// off quickly and must not call back into the engine.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: TrackingEvent);
}

/// Forwards events over an `mpsc` channel to another thread.
pub struct ChannelSink {
    sender: Mutex<mpsc::Sender<TrackingEvent>>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<TrackingEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: TrackingEvent) {
        let sender = match self.sender.lock() {
            Ok(sender) => sender,
            Err(poisoned) => poisoned.into_inner(),
        };
        if sender.send(event).is_err() {
            warn!("[TrailTracker] Event receiver dropped");
        }
    }
}
