//! Device location: the callback-style platform capability and the resolver
//! that turns one request into a future.

use crate::types::{Coordinate, LocationError, LocationPriority};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// What a platform location request ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Delivered(Coordinate),
    /// The service answered but had no position.
    NoFix,
    Failed(LocationError),
    Cancelled,
}

/// Completion callback for a location request. Invoked at most once.
pub type LocationCallback = Box<dyn FnOnce(LocationOutcome) + Send + 'static>;

/// Platform location service with a one-shot, callback-based API.
///
/// Implementations must call `on_complete` at most once. Dropping it without
/// calling it is treated as cancellation.
pub trait PlatformLocator: Send + Sync {
    fn name(&self) -> &str;

    fn request_current_location(&self, priority: LocationPriority, on_complete: LocationCallback);
}

/// Resolves the current device coordinate through a [`PlatformLocator`].
///
/// Stateless: every call issues exactly one platform request. No timeout is
/// applied here; drop the future to give up.
#[derive(Clone)]
pub struct LocationResolver {
    locator: Arc<dyn PlatformLocator>,
    priority: LocationPriority,
}

impl LocationResolver {
    pub fn new(locator: Arc<dyn PlatformLocator>) -> Self {
        Self {
            locator,
            priority: LocationPriority::HighAccuracy,
        }
    }

    pub fn with_priority(mut self, priority: LocationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn locator_name(&self) -> &str {
        self.locator.name()
    }

    pub fn priority(&self) -> LocationPriority {
        self.priority
    }

    /// `Ok(None)` means no coordinate could be obtained (no fix, cancelled).
    /// `Err` means the platform reported a failure.
    pub async fn resolve(&self) -> Result<Option<Coordinate>, LocationError> {
        let (tx, rx) = oneshot::channel();
        self.locator.request_current_location(
            self.priority,
            Box::new(move |outcome| {
                // Receiver is gone when the caller stopped waiting.
                let _ = tx.send(outcome);
            }),
        );

        match rx.await {
            Ok(LocationOutcome::Delivered(coordinate)) => {
                tracing::info!("Got location: {}", coordinate);
                Ok(Some(coordinate))
            }
            Ok(LocationOutcome::NoFix) => {
                tracing::info!("{} returned no location", self.locator.name());
                Ok(None)
            }
            Ok(LocationOutcome::Failed(e)) => Err(e),
            Ok(LocationOutcome::Cancelled) | Err(_) => {
                tracing::debug!("Location request via {} was cancelled", self.locator.name());
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("locator", &self.locator.name())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Always reports the same coordinate.
#[derive(Debug, Clone)]
pub struct FixedLocator {
    coordinate: Coordinate,
}

impl FixedLocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl PlatformLocator for FixedLocator {
    fn name(&self) -> &str {
        "manual"
    }

    fn request_current_location(&self, _priority: LocationPriority, on_complete: LocationCallback) {
        on_complete(LocationOutcome::Delivered(self.coordinate));
    }
}

/// For platforms without a location service.
#[derive(Debug, Clone, Default)]
pub struct NoLocator;

impl PlatformLocator for NoLocator {
    fn name(&self) -> &str {
        "none"
    }

    fn request_current_location(&self, _priority: LocationPriority, on_complete: LocationCallback) {
        on_complete(LocationOutcome::NoFix);
    }
}

/// Default location service for the running platform.
#[cfg(target_os = "linux")]
pub fn platform_locator(desktop_id: &str, fix_timeout: Duration) -> Arc<dyn PlatformLocator> {
    Arc::new(crate::geoclue::GeoClueLocator::new(desktop_id, fix_timeout))
}

#[cfg(windows)]
pub fn platform_locator(_desktop_id: &str, _fix_timeout: Duration) -> Arc<dyn PlatformLocator> {
    Arc::new(crate::windows_location::WindowsLocator)
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_locator(_desktop_id: &str, _fix_timeout: Duration) -> Arc<dyn PlatformLocator> {
    Arc::new(NoLocator)
}
