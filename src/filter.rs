//! Physical plausibility checks for raw fixes.
//!
//! The filter is a pure predicate: it never touches session state. Values the
//! platform could not determine fail the check that depends on them.

use crate::{Fix, TrackingConfig};

/// Why a fix was rejected before reaching the sampling policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Latitude/longitude non-finite or out of range
    InvalidCoordinates,
    /// Accuracy is zero or negative (sensor error, not perfect accuracy)
    AccuracyNonPositive,
    /// Accuracy is unknown (NaN)
    AccuracyUnknown,
    /// Accuracy at or above the ceiling
    AccuracyTooCoarse,
    /// Speed not reported
    SpeedUnknown,
    /// Speed above the implausible-speed ceiling
    SpeedImplausible,
}

/// Rejects physically implausible fixes.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    max_accuracy_m: f64,
    max_speed_mps: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

impl OutlierFilter {
    pub fn new(max_accuracy_m: f64, max_speed_mps: f64) -> Self {
        Self {
            max_accuracy_m,
            max_speed_mps,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.max_accuracy_m, config.max_speed_mps)
    }

    /// Whether the fix passes every plausibility check.
    pub fn accepts(&self, fix: &Fix, prior_speed: Option<f64>) -> bool {
        self.check(fix, prior_speed).is_ok()
    }

    /// Run the checks in order and report the first failure.
    ///
    /// `prior_speed` is the speed of the last accepted fix in the session and is
    /// only used for diagnostics.
    pub fn check(&self, fix: &Fix, prior_speed: Option<f64>) -> Result<(), RejectReason> {
        if !fix.has_valid_coordinates() {
            return Err(RejectReason::InvalidCoordinates);
        }

        let accuracy = fix.horizontal_accuracy;
        if accuracy.is_nan() {
            return Err(RejectReason::AccuracyUnknown);
        }
        if accuracy <= 0.0 {
            return Err(RejectReason::AccuracyNonPositive);
        }
        if accuracy >= self.max_accuracy_m {
            return Err(RejectReason::AccuracyTooCoarse);
        }

        let speed = match fix.speed {
            Some(s) if s.is_finite() && s >= 0.0 => s,
            _ => return Err(RejectReason::SpeedUnknown),
        };
        if speed > self.max_speed_mps {
            log::trace!(
                "[TrailTracker] Speed jump {:?} -> {:.1} m/s exceeds {:.1} m/s",
                prior_speed,
                speed,
                self.max_speed_mps
            );
            return Err(RejectReason::SpeedImplausible);
        }

        Ok(())
    }
}
