//! # Tracking Engine
//!
//! Composition root that wires the outlier filter, sampling policy, state
//! machine, background grant and power reporter behind one public contract.
//!
//! ## Architecture
//!
//! The engine owns all mutable tracking state behind a single mutex:
//! - Current lifecycle state
//! - The live session (interval, last accepted fix, sequence counter)
//! - The background grant
//! - Diagnostic counters
//!
//! Host commands (UI thread) and fix ingestion (provider thread) both take that
//! lock, so they are strictly serialized and no fix is ever processed while a
//! transition is half-applied. Events are emitted while the lock is held, which
//! gives consumers a total order consistent with arrival.
//!
//! Mobile code reaches the engine through the global [`TRACKER`] and the thin
//! FFI calls in `ffi.rs`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, trace, warn};
use once_cell::sync::Lazy;

use crate::{
    AuthorizationStatus, BackgroundGrant, BackgroundLifecycleGuard, Command, EventSink, Fix,
    GrantToken, LocationProvider, OutlierFilter, PowerInfoReporter, PowerSnapshot, PowerSource,
    RejectReason, Result, SamplingPolicy, TrackingConfig, TrackingError, TrackingEvent,
    TrackingSession, TrackingState, TrackingStateMachine, Transition,
};

// ============================================================================
// Core Types
// ============================================================================

/// Platform adapters the engine talks to.
#[derive(Clone)]
pub struct EngineAdapters {
    pub provider: Arc<dyn LocationProvider>,
    pub grant: Arc<dyn BackgroundGrant>,
    pub power: Arc<dyn PowerSource>,
    pub sink: Arc<dyn EventSink>,
}

/// What happened to one ingested fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    /// Forwarded to the sink with this sequence number
    Accepted { sequence: u64 },
    /// Failed a plausibility check
    Rejected(RejectReason),
    /// Arrived before the minimum interval elapsed
    Throttled,
    /// Engine was not Active
    Ignored(TrackingState),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }
}

/// Engine statistics for diagnostics. Counters reset when a session starts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackingStats {
    pub state: TrackingState,
    pub session_id: Option<String>,
    pub interval_secs: f64,
    pub accepted: u64,
    pub rejected_outlier: u64,
    pub rejected_throttled: u64,
    pub ignored_inactive: u64,
    /// Fixes that re-anchored the throttle after a clock jump
    pub clock_discontinuities: u64,
    pub grant_held: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    accepted: u64,
    rejected_outlier: u64,
    rejected_throttled: u64,
    ignored_inactive: u64,
    clock_discontinuities: u64,
}

/// Everything guarded by the engine lock.
struct EngineInner {
    machine: TrackingStateMachine,
    session: Option<TrackingSession>,
    /// Interval for the live session and the seed for the next one
    interval_secs: f64,
    guard: BackgroundLifecycleGuard,
    counters: Counters,
    last_error: Option<String>,
}

// ============================================================================
// Tracking Engine
// ============================================================================

/// The adaptive background location tracking engine.
pub struct TrackingEngine {
    config: TrackingConfig,
    filter: OutlierFilter,
    policy: SamplingPolicy,
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn EventSink>,
    power: PowerInfoReporter,
    inner: Mutex<EngineInner>,
}

impl TrackingEngine {
    /// Create an engine with default configuration.
    pub fn new(adapters: EngineAdapters) -> Self {
        Self::with_config(TrackingConfig::default(), adapters)
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: TrackingConfig, adapters: EngineAdapters) -> Self {
        let config = config.validated();
        let policy = SamplingPolicy::from_config(&config);

        Self {
            filter: OutlierFilter::from_config(&config),
            provider: adapters.provider,
            sink: adapters.sink,
            power: PowerInfoReporter::new(adapters.power),
            inner: Mutex::new(EngineInner {
                machine: TrackingStateMachine::new(),
                session: None,
                interval_secs: policy.clamp_interval(config.default_interval_secs),
                guard: BackgroundLifecycleGuard::new(adapters.grant),
                counters: Counters::default(),
                last_error: None,
            }),
            policy,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        // A panic in an adapter must not wedge stop()
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, transition: Transition) {
        if let Transition::Changed { to, .. } = transition {
            self.sink.on_event(TrackingEvent::State { state: to });
        }
    }

    /// Stop everything the session holds: updates, backstop, grant, session.
    fn teardown(&self, inner: &mut EngineInner) {
        self.provider.stop_updates();
        if self.config.significant_change_backstop {
            self.provider.stop_significant_changes();
        }
        inner.guard.release();
        inner.session = None;
    }

    /// In Error, the useful answer to pause/resume is why the session died.
    fn explain(inner: &EngineInner, err: TrackingError) -> TrackingError {
        if err == TrackingError::NotTracking && inner.machine.state() == TrackingState::Error {
            if let Some(reason) = &inner.last_error {
                return TrackingError::provider_failure(reason.clone());
            }
        }
        err
    }

    // ========================================================================
    // Host Commands
    // ========================================================================

    /// Start tracking a session.
    ///
    /// Idempotent for the live session's id; a different id while a session is
    /// live fails with `AlreadyTracking`.
    pub fn start(&self, session_id: &str) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(TrackingError::InvalidSessionId);
        }

        let mut inner = self.lock();

        if let Some(session) = &inner.session {
            if session.session_id() == session_id {
                debug!("[TrailTracker] start('{}') ignored: already live", session_id);
                return Ok(());
            }
            return Err(TrackingError::AlreadyTracking {
                active_session: session.session_id().to_string(),
            });
        }

        let transition = inner.machine.apply(Command::Start)?;
        let interval = inner.interval_secs;
        inner.session = Some(TrackingSession::new(session_id, interval));
        inner.counters = Counters::default();
        inner.last_error = None;

        self.provider
            .set_desired_accuracy(self.policy.accuracy_tier(interval));
        self.provider.start_updates();
        if self.config.significant_change_backstop {
            self.provider.start_significant_changes();
        }
        inner.guard.acquire();

        info!(
            "[TrailTracker] Session '{}' started (interval {:.1}s)",
            session_id, interval
        );
        self.emit(transition);
        Ok(())
    }

    /// Stop tracking. Always succeeds and is safe from any state.
    ///
    /// The background grant is released even when no session is live.
    pub fn stop(&self) {
        let mut inner = self.lock();
        let current = inner.machine.state();
        let transition = inner
            .machine
            .apply(Command::Stop)
            .unwrap_or(Transition::Unchanged(current));

        if transition.is_changed() {
            let session_id = inner
                .session
                .as_ref()
                .map(|s| s.session_id().to_string())
                .unwrap_or_default();
            self.teardown(&mut inner);
            info!(
                "[TrailTracker] Session '{}' stopped ({} fixes accepted)",
                session_id, inner.counters.accepted
            );
            self.emit(transition);
        } else {
            inner.guard.release();
            debug!("[TrailTracker] stop() in {}: nothing to do", current);
        }
    }

    /// Pause tracking; provider updates stop but the grant is kept.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.lock();
        let transition = match inner.machine.apply(Command::Pause) {
            Ok(t) => t,
            Err(e) => return Err(Self::explain(&inner, e)),
        };

        if transition.is_changed() {
            self.provider.stop_updates();
            info!("[TrailTracker] Paused");
            self.emit(transition);
        }
        Ok(())
    }

    /// Resume a paused session.
    pub fn resume(&self) -> Result<()> {
        let mut inner = self.lock();
        let transition = match inner.machine.apply(Command::Resume) {
            Ok(t) => t,
            Err(e) => return Err(Self::explain(&inner, e)),
        };

        if transition.is_changed() {
            self.provider.start_updates();
            info!("[TrailTracker] Resumed");
            self.emit(transition);
        }
        Ok(())
    }

    /// Set the minimum interval between accepted fixes.
    ///
    /// Returns the effective interval after clamping to the floor. Applies to the
    /// live session, if any, and seeds future sessions.
    pub fn set_sampling_interval(&self, seconds: f64) -> Result<f64> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(TrackingError::InvalidInterval { seconds });
        }

        let effective = self.policy.clamp_interval(seconds);
        let mut inner = self.lock();
        inner.interval_secs = effective;

        if let Some(session) = inner.session.as_mut() {
            session.set_interval(effective);
            self.provider
                .set_desired_accuracy(self.policy.accuracy_tier(effective));
        }

        debug!(
            "[TrailTracker] Sampling interval {:.2}s requested, {:.2}s effective",
            seconds, effective
        );
        Ok(effective)
    }

    /// Current battery posture. Never fails.
    pub fn query_power(&self) -> PowerSnapshot {
        self.power.snapshot()
    }

    // ========================================================================
    // Provider Callbacks
    // ========================================================================

    /// Process one raw fix from the location provider.
    ///
    /// Only Active forwards fixes; everything else is dropped without buffering.
    pub fn ingest(&self, fix: Fix) -> IngestOutcome {
        let fix = fix.normalized();
        let mut inner = self.lock();
        let inner = &mut *inner;

        let state = inner.machine.state();
        let session = match inner.session.as_mut() {
            Some(session) if inner.machine.accepts_fixes() => session,
            _ => {
                inner.counters.ignored_inactive += 1;
                trace!("[TrailTracker] Fix dropped in state {}", state);
                return IngestOutcome::Ignored(state);
            }
        };

        if let Err(reason) = self.filter.check(&fix, session.last_accepted_speed()) {
            inner.counters.rejected_outlier += 1;
            debug!(
                "[TrailTracker] Fix rejected: {:?} (accuracy {:.1}m, speed {:?})",
                reason, fix.horizontal_accuracy, fix.speed
            );
            return IngestOutcome::Rejected(reason);
        }

        if self.policy.is_clock_discontinuity(session, fix.timestamp_ms) {
            inner.counters.clock_discontinuities += 1;
            warn!(
                "[TrailTracker] Fix at {} predates last accepted {:?}; re-anchoring throttle",
                fix.timestamp_ms,
                session.last_accepted_ms()
            );
        } else if !self.policy.should_accept(&fix, session, fix.timestamp_ms) {
            inner.counters.rejected_throttled += 1;
            trace!("[TrailTracker] Fix at {} throttled", fix.timestamp_ms);
            return IngestOutcome::Throttled;
        }

        let gate = self.policy.next_interval(&fix, session);
        let sequence = session.record_accepted(&fix, gate);
        inner.counters.accepted += 1;

        debug!(
            "[TrailTracker] Fix #{} accepted ({:.5}, {:.5}) ±{:.1}m",
            sequence, fix.latitude, fix.longitude, fix.horizontal_accuracy
        );
        self.sink.on_event(TrackingEvent::Location {
            fix: fix.with_sequence(sequence),
        });

        IngestOutcome::Accepted { sequence }
    }

    /// The provider failed fatally (authorization revoked, hardware error).
    ///
    /// A live session ends in `Error`; at rest this is only logged.
    pub fn on_provider_failure(&self, reason: &str) {
        let mut inner = self.lock();
        let current = inner.machine.state();
        let transition = inner
            .machine
            .apply(Command::ProviderFailed)
            .unwrap_or(Transition::Unchanged(current));

        if transition.is_changed() {
            error!("[TrailTracker] Provider failure: {}", reason);
            self.teardown(&mut inner);
            inner.last_error = Some(reason.to_string());
            self.emit(transition);
        } else {
            warn!(
                "[TrailTracker] Provider failure in {} ignored: {}",
                current, reason
            );
        }
    }

    /// Location permission changed.
    pub fn on_authorization_changed(&self, status: AuthorizationStatus) {
        if status.is_revoked() {
            self.on_provider_failure("location authorization revoked");
        } else if status == AuthorizationStatus::NotDetermined {
            // Hold the lock so the request is ordered with other commands
            let _inner = self.lock();
            self.provider.request_authorization();
        } else if !status.allows_background() {
            warn!("[TrailTracker] Background location requires 'Always' permission");
        } else {
            debug!("[TrailTracker] Authorization: always");
        }
    }

    /// The background grant is about to be reclaimed by the OS.
    ///
    /// Forces a stop so no Active state survives a process suspension. Tokens
    /// other than the one currently held are stale and ignored.
    pub fn on_grant_expiring(&self, token: GrantToken) {
        let mut inner = self.lock();
        if !inner.guard.holds(token) {
            debug!("[TrailTracker] Stale grant expiry {:?} ignored", token);
            return;
        }

        let current = inner.machine.state();
        let transition = inner
            .machine
            .apply(Command::GrantExpired)
            .unwrap_or(Transition::Unchanged(current));

        warn!("[TrailTracker] Background grant expiring in {}, stopping", current);
        self.teardown(&mut inner);
        self.emit(transition);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> TrackingState {
        self.lock().machine.state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock()
            .session
            .as_ref()
            .map(|s| s.session_id().to_string())
    }

    /// Interval applied to the live session (or the next one).
    pub fn sampling_interval(&self) -> f64 {
        self.lock().interval_secs
    }

    /// Whether a background grant is currently held.
    pub fn grant_held(&self) -> bool {
        self.lock().guard.is_held()
    }

    /// Reason of the provider failure that ended the last session, if any.
    pub fn last_error(&self) -> Option<TrackingError> {
        self.lock()
            .last_error
            .as_ref()
            .map(|reason| TrackingError::provider_failure(reason.clone()))
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn stats(&self) -> TrackingStats {
        let inner = self.lock();
        TrackingStats {
            state: inner.machine.state(),
            session_id: inner.session.as_ref().map(|s| s.session_id().to_string()),
            interval_secs: inner.interval_secs,
            accepted: inner.counters.accepted,
            rejected_outlier: inner.counters.rejected_outlier,
            rejected_throttled: inner.counters.rejected_throttled,
            ignored_inactive: inner.counters.ignored_inactive,
            clock_discontinuities: inner.counters.clock_discontinuities,
            grant_held: inner.guard.is_held(),
        }
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global tracking engine instance.
///
/// Installed once at app startup with the platform adapters so FFI calls can
/// reach the engine without passing state across the boundary.
pub static TRACKER: Lazy<Mutex<Option<Arc<TrackingEngine>>>> = Lazy::new(|| Mutex::new(None));

/// Install the global engine, stopping any engine it replaces.
pub fn install_tracker(engine: TrackingEngine) -> Arc<TrackingEngine> {
    let engine = Arc::new(engine);
    let previous = {
        let mut guard = TRACKER.lock().unwrap_or_else(PoisonError::into_inner);
        guard.replace(Arc::clone(&engine))
    };
    if let Some(previous) = previous {
        info!("[TrailTracker] Replacing installed engine");
        previous.stop();
    }
    engine
}

/// Remove the global engine, stopping it first.
pub fn uninstall_tracker() -> Option<Arc<TrackingEngine>> {
    let engine = TRACKER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()?;
    engine.stop();
    Some(engine)
}

/// Run `f` against the global engine, if installed.
///
/// The global lock is released before `f` runs, so adapters may call back into
/// the engine from other threads while a command is in flight.
pub fn with_tracker<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&TrackingEngine) -> R,
{
    let engine = TRACKER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .cloned()?;
    Some(f(&engine))
}

// ============================================================================
// Tests
// ============================================================================
