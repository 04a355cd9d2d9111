//! Location provider adapter contract.
//!
//! The platform adapter (CoreLocation, FusedLocationProvider, ...) receives
//! commands through [`LocationProvider`] and delivers results back through the
//! engine: fixes via `ingest`, fatal errors via `on_provider_failure`, and
//! permission changes via `on_authorization_changed`.
//!
//! All commands are fire-and-forget. Implementations must not call back into
//! the engine synchronously from these methods; the engine holds its lock while
//! issuing them.

use serde::{Deserialize, Serialize};

use crate::AccuracyTier;

pub trait LocationProvider: Send + Sync {
    /// Begin continuous location updates.
    fn start_updates(&self);

    /// Stop continuous location updates.
    fn stop_updates(&self);

    /// Hint the provider's power/accuracy trade-off.
    fn set_desired_accuracy(&self, tier: AccuracyTier);

    /// Begin coarse significant-change monitoring (backstop while paused or
    /// suspended). Platforms without such a mode can ignore it.
    fn start_significant_changes(&self) {}

    fn stop_significant_changes(&self) {}

    /// Ask the user for location permission.
    fn request_authorization(&self) {}
}

/// Provider that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

impl LocationProvider for NoopProvider {
    fn start_updates(&self) {}
    fn stop_updates(&self) {}
    fn set_desired_accuracy(&self, _tier: AccuracyTier) {}
}

/// Location permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationStatus {
    /// Whether this status ends any live session.
    pub fn is_revoked(&self) -> bool {
        matches!(self, AuthorizationStatus::Denied | AuthorizationStatus::Restricted)
    }

    /// Whether updates keep flowing with the screen off.
    pub fn allows_background(&self) -> bool {
        *self == AuthorizationStatus::AuthorizedAlways
    }
}
