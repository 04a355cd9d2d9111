//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the tracking engine to
//! Kotlin and Swift. Platform code implements four callback interfaces (location
//! provider, background grant, power source, event sink), installs the engine
//! once with `tracker_init`, and then forwards host commands and provider
//! callbacks through the `tracker_*` functions.

use std::sync::Arc;

use log::info;

use crate::engine::{install_tracker, uninstall_tracker, with_tracker};
use crate::{
    init_logging, AccuracyTier, AuthorizationStatus, BackgroundGrant, EngineAdapters, EventSink,
    Fix, GrantToken, LocationProvider, PowerSnapshot, PowerSource, TrackingConfig,
    TrackingEngine, TrackingError, TrackingEvent, TrackingState, TrackingStats,
};

// ============================================================================
// Callback Interfaces (implemented in Kotlin/Swift)
// ============================================================================

/// Platform location provider (CoreLocation / FusedLocationProvider).
/// Must not call back into the tracker from inside these methods.
#[uniffi::export(callback_interface)]
pub trait LocationProviderCallback: Send + Sync {
    fn start_updates(&self);
    fn stop_updates(&self);
    fn set_desired_accuracy(&self, tier: AccuracyTier);
    fn start_significant_changes(&self);
    fn stop_significant_changes(&self);
    fn request_authorization(&self);
}

/// Background task (iOS) or foreground service promotion (Android).
#[uniffi::export(callback_interface)]
pub trait BackgroundGrantCallback: Send + Sync {
    /// Return a token identifying the grant, or None if the OS refused.
    fn acquire(&self) -> Option<u64>;
    fn release(&self, token: u64);
}

/// Battery readings. Return None for unsupported readings.
#[uniffi::export(callback_interface)]
pub trait PowerSourceCallback: Send + Sync {
    fn battery_level(&self) -> Option<f64>;
    fn low_power_mode(&self) -> Option<bool>;
}

/// Receives accepted fixes and state changes, in order.
#[uniffi::export(callback_interface)]
pub trait EventSinkCallback: Send + Sync {
    fn on_location(&self, fix: Fix);
    fn on_state_changed(&self, state: TrackingState);
}

// ============================================================================
// Bridges to the core adapter traits
// ============================================================================

struct ProviderBridge(Box<dyn LocationProviderCallback>);

impl LocationProvider for ProviderBridge {
    fn start_updates(&self) {
        self.0.start_updates();
    }
    fn stop_updates(&self) {
        self.0.stop_updates();
    }
    fn set_desired_accuracy(&self, tier: AccuracyTier) {
        self.0.set_desired_accuracy(tier);
    }
    fn start_significant_changes(&self) {
        self.0.start_significant_changes();
    }
    fn stop_significant_changes(&self) {
        self.0.stop_significant_changes();
    }
    fn request_authorization(&self) {
        self.0.request_authorization();
    }
}

struct GrantBridge(Box<dyn BackgroundGrantCallback>);

impl BackgroundGrant for GrantBridge {
    fn acquire(&self) -> Option<GrantToken> {
        self.0.acquire().map(GrantToken)
    }
    fn release(&self, token: GrantToken) {
        self.0.release(token.0);
    }
}

struct PowerBridge(Box<dyn PowerSourceCallback>);

impl PowerSource for PowerBridge {
    fn battery_level(&self) -> Option<f64> {
        self.0.battery_level()
    }
    fn low_power_mode(&self) -> Option<bool> {
        self.0.low_power_mode()
    }
}

struct SinkBridge(Box<dyn EventSinkCallback>);

impl EventSink for SinkBridge {
    fn on_event(&self, event: TrackingEvent) {
        match event {
            TrackingEvent::Location { fix } => self.0.on_location(fix),
            TrackingEvent::State { state } => self.0.on_state_changed(state),
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Install the tracking engine with platform adapters.
/// Call once at app startup; calling again replaces (and stops) the old engine.
#[uniffi::export]
pub fn tracker_init(
    config: TrackingConfig,
    provider: Box<dyn LocationProviderCallback>,
    grant: Box<dyn BackgroundGrantCallback>,
    power: Box<dyn PowerSourceCallback>,
    sink: Box<dyn EventSinkCallback>,
) {
    init_logging();
    info!("[TrailTracker] tracker_init: {}", config.to_json());

    let engine = TrackingEngine::with_config(
        config,
        EngineAdapters {
            provider: Arc::new(ProviderBridge(provider)),
            grant: Arc::new(GrantBridge(grant)),
            power: Arc::new(PowerBridge(power)),
            sink: Arc::new(SinkBridge(sink)),
        },
    );
    install_tracker(engine);
}

/// Check if the engine is installed.
#[uniffi::export]
pub fn tracker_is_initialized() -> bool {
    with_tracker(|_| ()).is_some()
}

/// Stop and remove the engine.
#[uniffi::export]
pub fn tracker_shutdown() {
    init_logging();
    if uninstall_tracker().is_some() {
        info!("[TrailTracker] Engine shut down");
    }
}

/// Get default configuration.
#[uniffi::export]
pub fn tracker_default_config() -> TrackingConfig {
    TrackingConfig::default()
}

// ============================================================================
// Host Commands
// ============================================================================

#[uniffi::export]
pub fn tracker_start(session_id: String) -> Result<(), TrackingError> {
    init_logging();
    with_tracker(|e| e.start(&session_id)).unwrap_or(Err(TrackingError::NotInitialized))
}

/// Stop tracking. Succeeds even when the engine is not installed.
#[uniffi::export]
pub fn tracker_stop() {
    init_logging();
    with_tracker(|e| e.stop());
}

#[uniffi::export]
pub fn tracker_pause() -> Result<(), TrackingError> {
    init_logging();
    with_tracker(|e| e.pause()).unwrap_or(Err(TrackingError::NotInitialized))
}

#[uniffi::export]
pub fn tracker_resume() -> Result<(), TrackingError> {
    init_logging();
    with_tracker(|e| e.resume()).unwrap_or(Err(TrackingError::NotInitialized))
}

/// Set the minimum sampling interval. Returns the effective (clamped) interval.
#[uniffi::export]
pub fn tracker_set_sampling_interval(seconds: f64) -> Result<f64, TrackingError> {
    init_logging();
    with_tracker(|e| e.set_sampling_interval(seconds)).unwrap_or(Err(TrackingError::NotInitialized))
}

/// Battery snapshot. Falls back to the safe default when not installed.
#[uniffi::export]
pub fn tracker_query_power() -> PowerSnapshot {
    with_tracker(|e| e.query_power()).unwrap_or_default()
}

#[uniffi::export]
pub fn tracker_get_state() -> TrackingState {
    with_tracker(|e| e.state()).unwrap_or(TrackingState::Idle)
}

#[uniffi::export]
pub fn tracker_get_stats() -> Option<TrackingStats> {
    with_tracker(|e| e.stats())
}

// ============================================================================
// Provider Callbacks
// ============================================================================

/// Deliver a raw fix. Returns true if it was accepted and emitted.
#[uniffi::export]
pub fn tracker_ingest(fix: Fix) -> bool {
    with_tracker(|e| e.ingest(fix).is_accepted()).unwrap_or(false)
}

#[uniffi::export]
pub fn tracker_on_provider_failure(reason: String) {
    init_logging();
    with_tracker(|e| e.on_provider_failure(&reason));
}

#[uniffi::export]
pub fn tracker_on_authorization_changed(status: AuthorizationStatus) {
    init_logging();
    with_tracker(|e| e.on_authorization_changed(status));
}

/// The OS is about to reclaim the grant identified by `token`.
#[uniffi::export]
pub fn tracker_on_grant_expiring(token: u64) {
    init_logging();
    with_tracker(|e| e.on_grant_expiring(GrantToken(token)));
}
