//! Windows.Devices.Geolocation location (Windows).

use crate::location::{LocationCallback, LocationOutcome, PlatformLocator};
use crate::types::{Coordinate, LocationError, LocationPriority};
use std::sync::Mutex;
use windows::Devices::Geolocation::{Geolocator, Geoposition, PositionAccuracy};
use windows::Foundation::{AsyncOperationCompletedHandler, AsyncStatus, IAsyncOperation};

// HRESULT for E_ACCESSDENIED
const E_ACCESS_DENIED: i32 = 0x8007_0005_u32 as i32;

#[derive(Debug, Clone, Default)]
pub struct WindowsLocator;

impl PlatformLocator for WindowsLocator {
    fn name(&self) -> &str {
        "windows"
    }

    fn request_current_location(&self, priority: LocationPriority, on_complete: LocationCallback) {
        let operation = match start_request(priority) {
            Ok(op) => op,
            Err(e) => {
                on_complete(LocationOutcome::Failed(map_windows_error(&e)));
                return;
            }
        };

        // The handler is FnMut; the callback must run only once.
        let pending = Mutex::new(Some(on_complete));
        let handler = AsyncOperationCompletedHandler::new(
            move |op: Option<&IAsyncOperation<Geoposition>>, status: AsyncStatus| {
                let callback = match pending.lock() {
                    Ok(mut guard) => guard.take(),
                    Err(_) => None,
                };
                if let Some(callback) = callback {
                    callback(completion_outcome(op, status));
                }
                Ok(())
            },
        );

        if let Err(e) = operation.SetCompleted(&handler) {
            tracing::warn!("Failed to register geolocation completion handler: {}", e);
        }
    }
}

fn start_request(priority: LocationPriority) -> windows::core::Result<IAsyncOperation<Geoposition>> {
    let locator = Geolocator::new()?;
    locator.SetDesiredAccuracy(match priority {
        LocationPriority::HighAccuracy => PositionAccuracy::High,
        LocationPriority::Balanced => PositionAccuracy::Default,
    })?;
    locator.GetGeopositionAsync()
}

fn completion_outcome(
    op: Option<&IAsyncOperation<Geoposition>>,
    status: AsyncStatus,
) -> LocationOutcome {
    let Some(op) = op else {
        return LocationOutcome::NoFix;
    };

    if status == AsyncStatus::Canceled {
        return LocationOutcome::Cancelled;
    }

    if status == AsyncStatus::Error {
        return match op.ErrorCode() {
            Ok(code) if code.0 == E_ACCESS_DENIED => {
                LocationOutcome::Failed(LocationError::PermissionDenied)
            }
            Ok(code) => LocationOutcome::Failed(LocationError::Other(code.message())),
            Err(e) => LocationOutcome::Failed(map_windows_error(&e)),
        };
    }

    let position = op
        .GetResults()
        .and_then(|pos| pos.Coordinate())
        .and_then(|coord| coord.Point())
        .and_then(|point| point.Position());

    match position {
        Ok(p) => LocationOutcome::Delivered(Coordinate::new(p.Latitude, p.Longitude)),
        Err(e) => LocationOutcome::Failed(map_windows_error(&e)),
    }
}

fn map_windows_error(err: &windows::core::Error) -> LocationError {
    if err.code().0 == E_ACCESS_DENIED {
        LocationError::PermissionDenied
    } else {
        LocationError::Other(err.message())
    }
}
