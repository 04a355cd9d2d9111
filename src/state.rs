//! Tracking lifecycle state machine.
//!
//! ```text
//!            start               pause
//!   Idle ───────────► Active ◄─────────► Paused
//!    ▲                  │  resume          │
//!    │                  │ stop / expiry    │ stop / expiry
//!    │                  ▼                  ▼
//!    └── (start) ── Stopped ◄──────────────┘
//!
//!   Active/Paused ── provider failure ──► Error ── start ──► Active
//! ```
//!
//! `Idle`, `Stopped` and `Error` are rest states: no session exists and only
//! `start` leaves them. The machine itself is pure; side effects (provider,
//! background grant, events) are driven by the engine from the returned
//! [`Transition`].

use serde::{Deserialize, Serialize};

use crate::{Result, TrackingError};

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    #[default]
    Idle,
    Active,
    Paused,
    Stopped,
    Error,
}

impl TrackingState {
    /// Name used in state-change events.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingState::Idle => "idle",
            TrackingState::Active => "active",
            TrackingState::Paused => "paused",
            TrackingState::Stopped => "stopped",
            TrackingState::Error => "error",
        }
    }

    /// Whether a session is live in this state.
    pub fn has_session(&self) -> bool {
        matches!(self, TrackingState::Active | TrackingState::Paused)
    }

    /// Whether the state is a rest state (no session, only `start` leaves it).
    pub fn is_rest(&self) -> bool {
        !self.has_session()
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    ProviderFailed,
    GrantExpired,
}

/// Outcome of applying a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed; exactly one state event must be emitted.
    Changed {
        from: TrackingState,
        to: TrackingState,
    },
    /// No-op; nothing is emitted.
    Unchanged(TrackingState),
}

impl Transition {
    pub fn is_changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }

    /// State after the command.
    pub fn state(&self) -> TrackingState {
        match *self {
            Transition::Changed { to, .. } => to,
            Transition::Unchanged(state) => state,
        }
    }
}

/// Explicit lifecycle state; replaces loose `isTracking`/`isPaused` flags.
#[derive(Debug, Clone, Default)]
pub struct TrackingStateMachine {
    state: TrackingState,
}

impl TrackingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Only Active forwards fixes downstream.
    pub fn accepts_fixes(&self) -> bool {
        self.state == TrackingState::Active
    }

    /// Apply a command, returning the transition or a typed error.
    ///
    /// `Start` while a session is live is reported as `Unchanged`; whether that is
    /// an idempotent success or `AlreadyTracking` depends on the session id and is
    /// decided by the engine.
    pub fn apply(&mut self, command: Command) -> Result<Transition> {
        use TrackingState::*;

        let next = match (self.state, command) {
            (Idle | Stopped | Error, Command::Start) => Some(Active),
            (Active | Paused, Command::Start) => None,

            (Active, Command::Pause) => Some(Paused),
            (Paused, Command::Pause) => None,
            (Paused, Command::Resume) => Some(Active),
            (Active, Command::Resume) => None,
            (Idle | Stopped | Error, Command::Pause | Command::Resume) => {
                return Err(TrackingError::NotTracking);
            }

            (Active | Paused, Command::Stop | Command::GrantExpired) => Some(Stopped),
            (Active | Paused, Command::ProviderFailed) => Some(Error),
            (
                Idle | Stopped | Error,
                Command::Stop | Command::GrantExpired | Command::ProviderFailed,
            ) => None,
        };

        Ok(match next {
            Some(to) => {
                let from = self.state;
                self.state = to;
                Transition::Changed { from, to }
            }
            None => Transition::Unchanged(self.state),
        })
    }
}
