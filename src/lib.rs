//! # Trail Tracker
//!
//! Adaptive background location tracking engine for the TrailRun mobile app.
//!
//! This library provides:
//! - Outlier rejection for raw GPS fixes (accuracy and speed plausibility)
//! - Minimum-interval sampling with accuracy-tier hints for the location provider
//! - A single explicit tracking state machine (Idle/Active/Paused/Stopped/Error)
//! - Background execution grant bookkeeping that survives app backgrounding
//! - Battery posture snapshots
//!
//! Platform code (Kotlin/Swift) only implements thin adapters: a location
//! provider, a background grant, a power source and an event sink. All decisions
//! are made here, once, for both platforms.
//!
//! ## Features
//!
//! - **`ffi`** - Enable UniFFI bindings for mobile platforms (iOS/Android)
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{mpsc, Arc};
//! use trail_tracker::{
//!     ChannelSink, EngineAdapters, Fix, NoopGrant, NoopProvider, StaticPowerSource,
//!     TrackingEngine, TrackingEvent,
//! };
//!
//! let (tx, rx) = mpsc::channel();
//! let engine = TrackingEngine::new(EngineAdapters {
//!     provider: Arc::new(NoopProvider),
//!     grant: Arc::new(NoopGrant),
//!     power: Arc::new(StaticPowerSource::unknown()),
//!     sink: Arc::new(ChannelSink::new(tx)),
//! });
//!
//! engine.start("morning-run").unwrap();
//! engine.ingest(Fix::new(46.5197, 6.6323, 5.0, 0).with_speed(2.5));
//! engine.stop();
//!
//! let events: Vec<TrackingEvent> = rx.try_iter().collect();
//! assert_eq!(events.len(), 3); // active, location, stopped
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackingError};

// Physical plausibility checks on raw fixes
pub mod filter;
pub use filter::{OutlierFilter, RejectReason};

// Minimum-interval throttling and accuracy tiers
pub mod sampling;
pub use sampling::{AccuracyTier, SamplingPolicy};

// Lifecycle state machine
pub mod state;
pub use state::{Command, TrackingState, TrackingStateMachine, Transition};

// Per-session bookkeeping
pub mod session;
pub use session::TrackingSession;

// Background execution grant
pub mod background;
pub use background::{BackgroundGrant, BackgroundLifecycleGuard, GrantToken, NoopGrant};

// Battery posture
pub mod power;
pub use power::{PowerInfoReporter, PowerSnapshot, PowerSource, StaticPowerSource};

// Location provider adapter contract
pub mod provider;
pub use provider::{AuthorizationStatus, LocationProvider, NoopProvider};

// Ordered event emission
pub mod events;
pub use events::{ChannelSink, EventSink, TrackingEvent};

// Composition root (singleton with all tracking state)
pub mod engine;
pub use engine::{
    install_tracker, uninstall_tracker, with_tracker, EngineAdapters, IngestOutcome,
    TrackingEngine, TrackingStats, TRACKER,
};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrailTracker"),
    );
}

/// Initialize logging for iOS (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "ios"))]
pub(crate) fn init_logging() {
    use log::LevelFilter;
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = oslog::OsLogger::new("com.trailrun.tracker")
            .level_filter(LevelFilter::Debug)
            .init();
    });
}

#[cfg(all(feature = "ffi", not(any(target_os = "android", target_os = "ios"))))]
pub(crate) fn init_logging() {
    // No-op on non-mobile platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// One raw location observation from the platform location provider.
///
/// Unknown speed, heading and elevation are `None`. Platforms that report
/// unknown values as negative sentinels should go through
/// [`Fix::from_platform`] (or call [`Fix::normalized`]).
///
/// The `sequence` field is assigned by the engine when the fix is accepted;
/// whatever the provider puts there is overwritten.
///
/// # Example
/// ```
/// use trail_tracker::Fix;
/// let fix = Fix::new(46.5197, 6.6323, 5.0, 1_700_000_000_000).with_speed(3.1);
/// assert_eq!(fix.speed, Some(3.1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Fix {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: Option<f64>,
    /// Horizontal accuracy radius in meters
    #[serde(rename = "accuracy")]
    pub horizontal_accuracy: f64,
    /// Ground speed in m/s
    pub speed: Option<f64>,
    /// Course over ground in degrees
    pub heading: Option<f64>,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Position within the session's accepted fixes (0, 1, 2, ...)
    pub sequence: u64,
}

impl Fix {
    /// Create a fix with only position, accuracy and time.
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            horizontal_accuracy,
            speed: None,
            heading: None,
            timestamp_ms,
            sequence: 0,
        }
    }

    /// Build a fix from raw platform values, mapping negative or non-finite
    /// speed/heading and non-finite elevation to unknown.
    #[allow(clippy::too_many_arguments)]
    pub fn from_platform(
        latitude: f64,
        longitude: f64,
        elevation: f64,
        horizontal_accuracy: f64,
        speed: f64,
        heading: f64,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            elevation: Some(elevation),
            horizontal_accuracy,
            speed: Some(speed),
            heading: Some(heading),
            timestamp_ms,
            sequence: 0,
        }
        .normalized()
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Replace sentinel values with `None`.
    pub fn normalized(mut self) -> Self {
        self.speed = self.speed.filter(|s| s.is_finite() && *s >= 0.0);
        self.heading = self.heading.filter(|h| h.is_finite() && *h >= 0.0);
        self.elevation = self.elevation.filter(|e| e.is_finite());
        self
    }

    /// Check if the fix has valid coordinates.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Configuration for the tracking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default)]
pub struct TrackingConfig {
    /// Floor for the sampling interval. Requested intervals below this are raised to it.
    /// Default: 1.0 seconds
    pub min_interval_secs: f64,

    /// Interval seeded into a new session until the host changes it.
    /// Default: 2.0 seconds
    pub default_interval_secs: f64,

    /// Fixes with horizontal accuracy at or above this are rejected.
    /// Default: 50.0 meters
    pub max_accuracy_m: f64,

    /// Fixes reporting speed above this are rejected.
    /// Default: 50.0 m/s (180 km/h)
    pub max_speed_mps: f64,

    /// Intervals up to this request best-available accuracy.
    /// Default: 1.0 seconds
    pub best_accuracy_max_interval_secs: f64,

    /// Intervals up to this (and above the best tier) request medium accuracy.
    /// Longer intervals request coarse accuracy. Default: 3.0 seconds
    pub medium_accuracy_max_interval_secs: f64,

    /// A fix dated this far before the last accepted fix is treated as a clock
    /// discontinuity and re-anchors the throttle instead of being dropped.
    /// Smaller regressions are dropped as out-of-order. Default: 60.0 seconds
    pub max_clock_regression_secs: f64,

    /// Keep coarse significant-change monitoring running for the whole session,
    /// including while paused. Default: true
    pub significant_change_backstop: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 1.0,
            default_interval_secs: 2.0,
            max_accuracy_m: 50.0,
            max_speed_mps: 50.0,
            best_accuracy_max_interval_secs: 1.0,
            medium_accuracy_max_interval_secs: 3.0,
            max_clock_regression_secs: 60.0,
            significant_change_backstop: true,
        }
    }
}

impl TrackingConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Self>(json).map(Self::validated)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Repair values that would break the engine's invariants.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let positive_or = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };

        let min_interval_secs = positive_or(self.min_interval_secs, defaults.min_interval_secs);
        let default_interval_secs =
            positive_or(self.default_interval_secs, defaults.default_interval_secs)
                .max(min_interval_secs);
        let best = positive_or(
            self.best_accuracy_max_interval_secs,
            defaults.best_accuracy_max_interval_secs,
        );
        let medium = positive_or(
            self.medium_accuracy_max_interval_secs,
            defaults.medium_accuracy_max_interval_secs,
        )
        .max(best);

        Self {
            min_interval_secs,
            default_interval_secs,
            max_accuracy_m: positive_or(self.max_accuracy_m, defaults.max_accuracy_m),
            max_speed_mps: positive_or(self.max_speed_mps, defaults.max_speed_mps),
            best_accuracy_max_interval_secs: best,
            medium_accuracy_max_interval_secs: medium,
            max_clock_regression_secs: positive_or(
                self.max_clock_regression_secs,
                defaults.max_clock_regression_secs,
            ),
            significant_change_backstop: self.significant_change_backstop,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
