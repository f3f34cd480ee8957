//! Location provider contract.
//!
//! The provider delivers fixes on its own schedule (callback-style, not
//! polled) through the channel handed to `subscribe`. The controller is
//! the only consumer; it checks its own state before applying a fix, so
//! a fix still in flight after an unsubscribe is discarded safely.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ProviderError;
use crate::fix::LocationFix;
use crate::storage::ProviderConfig;

/// Parameters for a fix subscription.
#[derive(Debug, Clone, Copy)]
pub struct FixRequest {
    /// Desired delivery interval.
    pub interval: Duration,
    /// Minimum displacement between reported fixes, in meters.
    pub min_displacement_m: f32,
}

impl From<&ProviderConfig> for FixRequest {
    fn from(cfg: &ProviderConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.interval_ms),
            min_displacement_m: cfg.min_displacement_m,
        }
    }
}

/// Handle for an active subscription.
///
/// `cancel` (and Drop) synchronously stops delivery. A fix already
/// queued in the channel may still arrive afterwards; the controller
/// ignores it.
#[derive(Debug)]
pub struct ProviderSubscription {
    task: JoinHandle<()>,
}

impl ProviderSubscription {
    /// Wrap the delivery task spawned by a provider.
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for ProviderSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Source of location fixes.
///
/// `subscribe` must be called from within a Tokio runtime; the returned
/// subscription owns the delivery task.
pub trait LocationProvider: Send + Sync {
    fn subscribe(
        &self,
        request: FixRequest,
        fixes: mpsc::UnboundedSender<LocationFix>,
    ) -> Result<ProviderSubscription, ProviderError>;
}

/// Deterministic provider for demos and tests.
///
/// Walks a small loop around an origin coordinate at the requested
/// interval, roughly honoring the displacement floor (one step is about
/// eleven meters at the equator).
pub struct SimulatedProvider {
    origin_latitude: f64,
    origin_longitude: f64,
}

impl SimulatedProvider {
    pub fn new(origin_latitude: f64, origin_longitude: f64) -> Self {
        Self {
            origin_latitude,
            origin_longitude,
        }
    }
}

impl LocationProvider for SimulatedProvider {
    fn subscribe(
        &self,
        request: FixRequest,
        fixes: mpsc::UnboundedSender<LocationFix>,
    ) -> Result<ProviderSubscription, ProviderError> {
        let (lat0, lng0) = (self.origin_latitude, self.origin_longitude);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(request.interval.max(Duration::from_millis(1)));
            let mut step: u64 = 0;
            loop {
                ticker.tick().await;
                let offset = (step % 60) as f64 * 0.0001;
                let fix = LocationFix::new(lat0 + offset, lng0 + offset);
                if fixes.send(fix).is_err() {
                    break; // Receiver gone, subscription over.
                }
                step += 1;
            }
        });
        Ok(ProviderSubscription::new(task))
    }
}
