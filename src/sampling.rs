//! Minimum-interval sampling policy.
//!
//! A fix is accepted only when enough time has passed since the last accepted
//! fix. This is a gate, not a fixed-rate sampler: fixes arriving faster than the
//! interval are dropped, never queued.
//!
//! The interval also selects an accuracy tier that is passed to the location
//! provider as a power/accuracy hint:
//!
//! | Interval            | Tier   |
//! |---------------------|--------|
//! | ≤ 1 s               | Best   |
//! | 1 s < interval ≤ 3 s| Medium |
//! | > 3 s               | Coarse |
//!
//! Both thresholds come from [`TrackingConfig`].

use serde::{Deserialize, Serialize};

use crate::{Fix, TrackingConfig, TrackingSession};

/// Desired accuracy requested from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    /// Best available (GPS, highest power)
    Best,
    /// Roughly ten-meter accuracy
    Medium,
    /// Roughly hundred-meter accuracy (lowest power)
    Coarse,
}

/// Decides whether a fix is due and which interval applies next.
#[derive(Debug, Clone, Copy)]
pub struct SamplingPolicy {
    min_interval_secs: f64,
    best_max_interval_secs: f64,
    medium_max_interval_secs: f64,
    max_clock_regression_ms: f64,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

impl SamplingPolicy {
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            min_interval_secs: config.min_interval_secs,
            best_max_interval_secs: config.best_accuracy_max_interval_secs,
            medium_max_interval_secs: config.medium_accuracy_max_interval_secs,
            max_clock_regression_ms: config.max_clock_regression_secs * 1000.0,
        }
    }

    /// Raise a requested interval to the floor. No upper bound is enforced.
    pub fn clamp_interval(&self, requested_secs: f64) -> f64 {
        requested_secs.max(self.min_interval_secs)
    }

    /// Whether `now_ms` is far enough past the last accepted fix.
    ///
    /// The gate is the larger of the session's current interval and the interval
    /// that was in effect when the previous fix was accepted, so shortening the
    /// interval never lets a fix in earlier than the previous acceptance allowed.
    /// Timestamps slightly older than the last accepted fix are rejected as
    /// out-of-order; a clock discontinuity re-anchors the gate and is accepted.
    pub fn should_accept(&self, _fix: &Fix, session: &TrackingSession, now_ms: i64) -> bool {
        let Some(last_ms) = session.last_accepted_ms() else {
            return true;
        };
        if self.is_clock_discontinuity(session, now_ms) {
            return true;
        }

        let gate_secs = self
            .clamp_interval(session.interval_secs())
            .max(session.gate_interval_secs());
        let elapsed_ms = now_ms.saturating_sub(last_ms);

        elapsed_ms as f64 >= gate_secs * 1000.0
    }

    /// Whether `now_ms` lies so far before the last accepted fix that the last
    /// fix (or this one) must carry a bad clock.
    /// A single future-dated fix must not throttle the rest of the session.
    pub fn is_clock_discontinuity(&self, session: &TrackingSession, now_ms: i64) -> bool {
        match session.last_accepted_ms() {
            Some(last_ms) => {
                last_ms.saturating_sub(now_ms) as f64 > self.max_clock_regression_ms
            }
            None => false,
        }
    }

    /// Minimum interval that must elapse after `fix` before the next acceptance.
    ///
    /// The interval is host-driven; observed speed does not change it.
    pub fn next_interval(&self, _fix: &Fix, session: &TrackingSession) -> f64 {
        self.clamp_interval(session.interval_secs())
    }

    /// Map an interval to the accuracy tier the provider should use.
    pub fn accuracy_tier(&self, interval_secs: f64) -> AccuracyTier {
        if interval_secs <= self.best_max_interval_secs {
            AccuracyTier::Best
        } else if interval_secs <= self.medium_max_interval_secs {
            AccuracyTier::Medium
        } else {
            AccuracyTier::Coarse
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_at(timestamp_ms: i64) -> Fix {
        Fix::new(46.5197, 6.6323, 5.0, timestamp_ms).with_speed(2.0)
    }

    fn accept(policy: &SamplingPolicy, session: &mut TrackingSession, fix: &Fix) {
        let next = policy.next_interval(fix, session);
        session.record_accepted(fix, next);
    }

    #[test]
    fn test_first_fix_always_accepted() {
        let policy = SamplingPolicy::default();
        let session = TrackingSession::new("run", 2.0);
        assert!(policy.should_accept(&fix_at(0), &session, 0));
    }

    #[test]
    fn test_minimum_interval_gate() {
        let policy = SamplingPolicy::default();
        let mut session = TrackingSession::new("run", 2.0);
        accept(&policy, &mut session, &fix_at(0));

        assert!(!policy.should_accept(&fix_at(500), &session, 500));
        assert!(!policy.should_accept(&fix_at(1999), &session, 1999));
        assert!(policy.should_accept(&fix_at(2000), &session, 2000));
        assert!(policy.should_accept(&fix_at(2100), &session, 2100));
    }

    #[test]
    fn test_out_of_order_timestamp_rejected() {
        let policy = SamplingPolicy::default();
        let mut session = TrackingSession::new("run", 1.0);
        accept(&policy, &mut session, &fix_at(10_000));
        assert!(!policy.should_accept(&fix_at(5_000), &session, 5_000));
    }

    #[test]
    fn test_clock_discontinuity_reanchors() {
        let policy = SamplingPolicy::default();
        let mut session = TrackingSession::new("run", 2.0);
        accept(&policy, &mut session, &fix_at(4_000_000_000_000));

        // Within the regression window: plain out-of-order
        let near = 4_000_000_000_000 - 30_000;
        assert!(!policy.is_clock_discontinuity(&session, near));
        assert!(!policy.should_accept(&fix_at(near), &session, near));

        let real = 1_700_000_000_000;
        assert!(policy.is_clock_discontinuity(&session, real));
        assert!(policy.should_accept(&fix_at(real), &session, real));

        accept(&policy, &mut session, &fix_at(real));
        assert!(!policy.should_accept(&fix_at(real + 1_000), &session, real + 1_000));
        assert!(policy.should_accept(&fix_at(real + 2_000), &session, real + 2_000));
    }

    #[test]
    fn test_clamp_to_floor() {
        let policy = SamplingPolicy::default();
        assert_eq!(policy.clamp_interval(0.1), 1.0);
        assert_eq!(policy.clamp_interval(1.0), 1.0);
        assert_eq!(policy.clamp_interval(600.0), 600.0);
    }

    #[test]
    fn test_shortened_interval_keeps_previous_gate() {
        let policy = SamplingPolicy::default();
        let mut session = TrackingSession::new("run", 5.0);
        accept(&policy, &mut session, &fix_at(0));

        session.set_interval(1.0);
        assert!(!policy.should_accept(&fix_at(1500), &session, 1500));
        assert!(policy.should_accept(&fix_at(5000), &session, 5000));

        accept(&policy, &mut session, &fix_at(5000));
        assert!(policy.should_accept(&fix_at(6000), &session, 6000));
    }

    #[test]
    fn test_lengthened_interval_applies_immediately() {
        let policy = SamplingPolicy::default();
        let mut session = TrackingSession::new("run", 1.0);
        accept(&policy, &mut session, &fix_at(0));

        session.set_interval(10.0);
        assert!(!policy.should_accept(&fix_at(5000), &session, 5000));
        assert!(policy.should_accept(&fix_at(10_000), &session, 10_000));
    }

    #[test]
    fn test_accuracy_tiers() {
        let policy = SamplingPolicy::default();
        assert_eq!(policy.accuracy_tier(0.5), AccuracyTier::Best);
        assert_eq!(policy.accuracy_tier(1.0), AccuracyTier::Best);
        assert_eq!(policy.accuracy_tier(1.5), AccuracyTier::Medium);
        assert_eq!(policy.accuracy_tier(3.0), AccuracyTier::Medium);
        assert_eq!(policy.accuracy_tier(3.01), AccuracyTier::Coarse);
        assert_eq!(policy.accuracy_tier(60.0), AccuracyTier::Coarse);
    }

    #[test]
    fn test_configurable_tier_thresholds() {
        let config = TrackingConfig {
            best_accuracy_max_interval_secs: 2.0,
            medium_accuracy_max_interval_secs: 10.0,
            ..TrackingConfig::default()
        };
        let policy = SamplingPolicy::from_config(&config);
        assert_eq!(policy.accuracy_tier(2.0), AccuracyTier::Best);
        assert_eq!(policy.accuracy_tier(5.0), AccuracyTier::Medium);
        assert_eq!(policy.accuracy_tier(11.0), AccuracyTier::Coarse);
    }
}
