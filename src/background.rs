//! Background execution grant.
//!
//! Models whatever OS primitive keeps the process eligible to run with the
//! screen off: a time-boxed background task on iOS, foreground-service
//! promotion on Android. The platform adapter implements [`BackgroundGrant`];
//! [`BackgroundLifecycleGuard`] makes acquire/release re-entrant.
//!
//! When the OS is about to reclaim a grant the adapter must call the engine's
//! `on_grant_expiring` with the token, which releases it and forces a stop.

use std::sync::Arc;

use log::{debug, warn};

/// Opaque handle for a held grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrantToken(pub u64);

/// Platform adapter for the keep-running grant.
///
/// Implementations must not call back into the engine synchronously from these
/// methods; the engine holds its lock while calling them.
pub trait BackgroundGrant: Send + Sync {
    /// Request a grant. `None` means the platform could not issue one.
    fn acquire(&self) -> Option<GrantToken>;

    /// Give a grant back to the OS.
    fn release(&self, token: GrantToken);
}

/// Grant adapter for platforms (and tests) without a background primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGrant;

impl BackgroundGrant for NoopGrant {
    fn acquire(&self) -> Option<GrantToken> {
        Some(GrantToken(0))
    }

    fn release(&self, _token: GrantToken) {}
}

/// Holds at most one grant.
///
/// Acquiring while holding is a no-op, as is releasing while not holding.
pub struct BackgroundLifecycleGuard {
    grant: Arc<dyn BackgroundGrant>,
    held: Option<GrantToken>,
}

impl BackgroundLifecycleGuard {
    pub fn new(grant: Arc<dyn BackgroundGrant>) -> Self {
        Self { grant, held: None }
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Acquire a grant unless one is already held.
    ///
    /// Returns the held token, or `None` if the platform refused.
    pub fn acquire(&mut self) -> Option<GrantToken> {
        if let Some(token) = self.held {
            return Some(token);
        }

        match self.grant.acquire() {
            Some(token) => {
                debug!("[TrailTracker] Background grant {:?} acquired", token);
                self.held = Some(token);
                Some(token)
            }
            None => {
                warn!("[TrailTracker] Background grant unavailable; tracking continues in foreground only");
                None
            }
        }
    }

    /// Release the held grant, if any.
    pub fn release(&mut self) {
        if let Some(token) = self.held.take() {
            debug!("[TrailTracker] Background grant {:?} released", token);
            self.grant.release(token);
        }
    }

    /// Whether `token` is the grant currently held.
    pub fn holds(&self, token: GrantToken) -> bool {
        self.held == Some(token)
    }
}

impl std::fmt::Debug for BackgroundLifecycleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundLifecycleGuard")
            .field("held", &self.held)
            .finish()
    }
}
