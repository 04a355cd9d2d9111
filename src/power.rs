//! Battery posture snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Battery level and low-power-mode flag at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct PowerSnapshot {
    /// Battery level as a fraction in [0.0, 1.0]
    pub level: f64,
    pub low_power_mode: bool,
}

impl Default for PowerSnapshot {
    /// Safe default when the platform cannot report: full battery, no saver.
    fn default() -> Self {
        Self {
            level: 1.0,
            low_power_mode: false,
        }
    }
}

/// Platform adapter for raw battery readings.
///
/// Return `None` when a reading is unsupported. iOS reports an unknown level as
/// -1.0; passing that through is fine, the reporter normalizes it.
pub trait PowerSource: Send + Sync {
    /// Battery level as a fraction of full charge.
    fn battery_level(&self) -> Option<f64>;

    fn low_power_mode(&self) -> Option<bool>;
}

/// Power source returning fixed readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPowerSource {
    pub level: Option<f64>,
    pub low_power_mode: Option<bool>,
}

impl StaticPowerSource {
    pub fn new(level: f64, low_power_mode: bool) -> Self {
        Self {
            level: Some(level),
            low_power_mode: Some(low_power_mode),
        }
    }

    /// A source that can read nothing.
    pub fn unknown() -> Self {
        Self::default()
    }
}

impl PowerSource for StaticPowerSource {
    fn battery_level(&self) -> Option<f64> {
        self.level
    }

    fn low_power_mode(&self) -> Option<bool> {
        self.low_power_mode
    }
}

/// Takes a fresh snapshot on every query; nothing is cached.
#[derive(Clone)]
pub struct PowerInfoReporter {
    source: Arc<dyn PowerSource>,
}

impl PowerInfoReporter {
    pub fn new(source: Arc<dyn PowerSource>) -> Self {
        Self { source }
    }

    /// Read the source and normalize. Never fails.
    pub fn snapshot(&self) -> PowerSnapshot {
        let level = match self.source.battery_level() {
            Some(level) if level.is_finite() && level >= 0.0 => level.min(1.0),
            _ => 1.0,
        };

        PowerSnapshot {
            level,
            low_power_mode: self.source.low_power_mode().unwrap_or(false),
        }
    }
}
