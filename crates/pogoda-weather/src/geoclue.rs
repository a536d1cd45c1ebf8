//! GeoClue2 location over the system D-Bus (Linux).

use crate::location::{LocationCallback, LocationOutcome, PlatformLocator};
use crate::types::{Coordinate, LocationError, LocationPriority};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use zbus::zvariant::{ObjectPath, OwnedObjectPath};
use zbus::{proxy, Connection};

// GClueAccuracyLevel values
const ACCURACY_CITY: u32 = 4;
const ACCURACY_EXACT: u32 = 8;

#[proxy(
    interface = "org.freedesktop.GeoClue2.Manager",
    default_service = "org.freedesktop.GeoClue2",
    default_path = "/org/freedesktop/GeoClue2/Manager"
)]
trait GeoClueManager {
    fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.GeoClue2.Client",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoClueClient {
    fn start(&self) -> zbus::Result<()>;

    fn stop(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn desktop_id(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn requested_accuracy_level(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn set_requested_accuracy_level(&self, level: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn location_updated(
        &self,
        previous: ObjectPath<'_>,
        current: ObjectPath<'_>,
    ) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.GeoClue2.Location",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoClueLocation {
    #[zbus(property)]
    fn latitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn longitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn accuracy(&self) -> zbus::Result<f64>;
}

/// Asks GeoClue for one fix and stops the client again.
#[derive(Debug, Clone)]
pub struct GeoClueLocator {
    desktop_id: String,
    fix_timeout: Duration,
}

impl GeoClueLocator {
    pub fn new(desktop_id: &str, fix_timeout: Duration) -> Self {
        Self {
            desktop_id: desktop_id.to_string(),
            fix_timeout,
        }
    }

    async fn locate(&self, priority: LocationPriority) -> LocationOutcome {
        match self.try_locate(priority).await {
            Ok(Some(coordinate)) => LocationOutcome::Delivered(coordinate),
            Ok(None) => LocationOutcome::NoFix,
            Err(e) => LocationOutcome::Failed(map_dbus_error(e)),
        }
    }

    async fn try_locate(&self, priority: LocationPriority) -> zbus::Result<Option<Coordinate>> {
        let connection = Connection::system().await?;
        let manager = GeoClueManagerProxy::new(&connection).await?;
        let client_path = manager.get_client().await?;

        let client = GeoClueClientProxy::builder(&connection)
            .path(client_path)?
            .build()
            .await?;

        client.set_desktop_id(&self.desktop_id).await?;
        client
            .set_requested_accuracy_level(accuracy_level(priority))
            .await?;

        // Subscribe before starting so the first update can't be missed.
        let mut updates = client.receive_location_updated().await?;
        client.start().await?;

        let fix_path = match tokio::time::timeout(self.fix_timeout, updates.next()).await {
            Ok(Some(signal)) => signal
                .args()
                .map(|args| Some(OwnedObjectPath::from(args.current().clone()))),
            Ok(None) => Ok(None),
            Err(_) => {
                tracing::info!(
                    "GeoClue produced no fix within {}s",
                    self.fix_timeout.as_secs()
                );
                Ok(None)
            }
        };

        stop_after(read_location(&connection, fix_path), client.stop()).await
    }
}

async fn read_location(
    connection: &Connection,
    fix_path: zbus::Result<Option<OwnedObjectPath>>,
) -> zbus::Result<Option<Coordinate>> {
    let Some(path) = fix_path? else {
        return Ok(None);
    };

    let location = GeoClueLocationProxy::builder(connection)
        .path(path)?
        .build()
        .await?;

    let latitude = location.latitude().await?;
    let longitude = location.longitude().await?;
    match location.accuracy().await {
        Ok(meters) => tracing::debug!("GeoClue fix accuracy: {:.0} m", meters),
        Err(e) => tracing::debug!("GeoClue accuracy unavailable: {}", e),
    }
    Ok(Some(Coordinate::new(latitude, longitude)))
}

/// Awaits `fix`, then `stop` whatever `fix` returned.
async fn stop_after<T>(
    fix: impl Future<Output = zbus::Result<T>>,
    stop: impl Future<Output = zbus::Result<()>>,
) -> zbus::Result<T> {
    let result = fix.await;
    if let Err(e) = stop.await {
        tracing::debug!("Failed to stop GeoClue client: {}", e);
    }
    result
}

impl PlatformLocator for GeoClueLocator {
    fn name(&self) -> &str {
        "geoclue"
    }

    fn request_current_location(&self, priority: LocationPriority, on_complete: LocationCallback) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::error!("GeoClue request made outside of a tokio runtime");
                on_complete(LocationOutcome::Failed(LocationError::ServiceUnavailable));
                return;
            }
        };

        let locator = self.clone();
        runtime.spawn(async move {
            let outcome = locator.locate(priority).await;
            on_complete(outcome);
        });
    }
}

fn accuracy_level(priority: LocationPriority) -> u32 {
    match priority {
        LocationPriority::HighAccuracy => ACCURACY_EXACT,
        LocationPriority::Balanced => ACCURACY_CITY,
    }
}

fn map_dbus_error(err: zbus::Error) -> LocationError {
    match &err {
        zbus::Error::MethodError(name, detail, _) => match name.as_str() {
            "org.freedesktop.DBus.Error.AccessDenied" => LocationError::PermissionDenied,
            "org.freedesktop.DBus.Error.ServiceUnknown"
            | "org.freedesktop.DBus.Error.NameHasNoOwner" => LocationError::ServiceUnavailable,
            "org.freedesktop.DBus.Error.NoReply" | "org.freedesktop.DBus.Error.Timeout" => {
                LocationError::Timeout
            }
            _ => LocationError::Other(detail.clone().unwrap_or_else(|| name.to_string())),
        },
        zbus::Error::FDO(fdo) => match fdo.as_ref() {
            zbus::fdo::Error::AccessDenied(_) => LocationError::PermissionDenied,
            zbus::fdo::Error::ServiceUnknown(_) | zbus::fdo::Error::NameHasNoOwner(_) => {
                LocationError::ServiceUnavailable
            }
            _ => LocationError::Other(err.to_string()),
        },
        zbus::Error::InputOutput(_) | zbus::Error::Address(_) => {
            tracing::debug!("System bus not reachable: {}", err);
            LocationError::ServiceUnavailable
        }
        _ => LocationError::Other(err.to_string()),
    }
}
