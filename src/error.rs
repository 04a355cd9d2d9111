//! Unified error handling for the tracking engine.
//!
//! Every host command returns [`Result`]; errors are never carried through the
//! event sink. All variants are recoverable from the host's point of view except
//! [`TrackingError::ProviderFailure`], which leaves the engine in `Error` until the
//! next `start`.

use thiserror::Error;

/// Unified error type for tracking engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum TrackingError {
    /// `start` was called with a different session id while a session is live
    #[error("Already tracking session '{active_session}'")]
    AlreadyTracking { active_session: String },

    /// `pause`/`resume` was called while no session is live
    #[error("Not tracking")]
    NotTracking,

    /// A non-positive (or non-finite) sampling interval was requested
    #[error("Invalid sampling interval: {seconds}s")]
    InvalidInterval { seconds: f64 },

    /// The host supplied an empty session id
    #[error("Session id must not be empty")]
    InvalidSessionId,

    /// The location provider failed fatally (e.g. authorization revoked)
    #[error("Location provider failure: {reason}")]
    ProviderFailure { reason: String },

    /// An FFI call arrived before the engine was installed
    #[error("Tracking engine not initialized")]
    NotInitialized,
}

/// Result type alias for tracking engine operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

impl TrackingError {
    /// Convenience constructor for provider failures.
    pub fn provider_failure(reason: impl Into<String>) -> Self {
        TrackingError::ProviderFailure {
            reason: reason.into(),
        }
    }

    /// Whether the host can simply retry or correct the call.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TrackingError::ProviderFailure { .. })
    }
}
