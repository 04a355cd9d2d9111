//! Per-session bookkeeping.
//!
//! One session exists per Active period. It is created when tracking starts and
//! dropped on stop or provider failure; pausing keeps it.

use crate::Fix;

/// State for one live tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSession {
    session_id: String,
    interval_secs: f64,
    /// Interval the policy attached to the last accepted fix
    gate_interval_secs: f64,
    last_accepted_ms: Option<i64>,
    last_accepted_speed: Option<f64>,
    next_sequence: u64,
}

impl TrackingSession {
    /// Create a session. `interval_secs` must already be clamped to the floor.
    pub fn new(session_id: impl Into<String>, interval_secs: f64) -> Self {
        Self {
            session_id: session_id.into(),
            interval_secs,
            gate_interval_secs: interval_secs,
            last_accepted_ms: None,
            last_accepted_speed: None,
            next_sequence: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current minimum inter-sample interval in seconds.
    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    /// Interval that was in effect when the last fix was accepted.
    pub fn gate_interval_secs(&self) -> f64 {
        self.gate_interval_secs
    }

    pub fn last_accepted_ms(&self) -> Option<i64> {
        self.last_accepted_ms
    }

    pub fn last_accepted_speed(&self) -> Option<f64> {
        self.last_accepted_speed
    }

    pub(crate) fn set_interval(&mut self, interval_secs: f64) {
        self.interval_secs = interval_secs;
    }

    /// Record an accepted fix and hand out its sequence number.
    pub(crate) fn record_accepted(&mut self, fix: &Fix, gate_interval_secs: f64) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.last_accepted_ms = Some(fix.timestamp_ms);
        self.last_accepted_speed = fix.speed;
        self.gate_interval_secs = gate_interval_secs;
        sequence
    }
}
