//! Drives location → weather → formatting and publishes the result.

use std::sync::Arc;

use pogoda_weather::{Coordinate, LocationResolver, WeatherSource};
use tokio::sync::{broadcast, watch};

use crate::format::content_from_payload;
use crate::state::{StateCell, WeatherUi};

pub const FALLBACK_LABEL: &str = "Fallback location";
const UNKNOWN_ERROR: &str = "unknown error";

/// Owns the weather screen state. The only writer of its [`StateCell`].
///
/// Loads run to completion on the caller's task. Starting a new load while
/// another is in flight does not cancel it; whichever writes last wins.
pub struct WeatherViewModel {
    weather: Arc<dyn WeatherSource>,
    resolver: LocationResolver,
    fallback: Coordinate,
    state: StateCell,
}

impl WeatherViewModel {
    pub fn new(weather: Arc<dyn WeatherSource>, resolver: LocationResolver) -> Self {
        Self {
            weather,
            resolver,
            fallback: Coordinate::FALLBACK,
            state: StateCell::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Coordinate) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> Coordinate {
        self.fallback
    }

    pub fn state(&self) -> WeatherUi {
        self.state.current()
    }

    pub fn watch(&self) -> watch::Receiver<WeatherUi> {
        self.state.watch()
    }

    pub fn transitions(&self) -> broadcast::Receiver<WeatherUi> {
        self.state.transitions()
    }

    /// First load: device location when permitted, otherwise the fallback.
    pub async fn start(&self, location_permitted: bool) {
        if location_permitted {
            self.load_with_device_location().await;
        } else {
            tracing::info!("Location not permitted, loading fallback location");
            self.load_for_fallback().await;
        }
    }

    /// Retry action from the display.
    pub async fn reload(&self) {
        self.load_with_device_location().await;
    }

    /// Weather for the fixed fallback coordinate. Errors here are final.
    pub async fn load_for_fallback(&self) {
        self.state.set(WeatherUi::Loading);

        match self.weather.fetch(self.fallback).await {
            Ok(payload) => {
                tracing::info!("Loaded weather for fallback location {}", self.fallback);
                self.state
                    .set(WeatherUi::Content(content_from_payload(FALLBACK_LABEL, &payload)));
            }
            Err(e) => {
                tracing::error!("Fallback weather load failed: {}", e);
                self.state.set(WeatherUi::Error {
                    message: error_message(&e),
                });
            }
        }
    }

    /// Weather for the device location, falling back to the fixed coordinate.
    ///
    /// No coordinate means a silent fallback. A resolver or fetch failure is
    /// shown as `Error` first and then replaced by the fallback load.
    pub async fn load_with_device_location(&self) {
        self.state.set(WeatherUi::Loading);

        match self.load_device_weather().await {
            Ok(true) => {}
            Ok(false) => self.load_for_fallback().await,
            Err(message) => {
                tracing::warn!("Device location load failed: {}", message);
                self.state.set(WeatherUi::Error { message });
                self.load_for_fallback().await;
            }
        }
    }

    /// `Ok(false)` when no device coordinate is available.
    async fn load_device_weather(&self) -> Result<bool, String> {
        let coordinate = match self.resolver.resolve().await {
            Ok(Some(coordinate)) => coordinate,
            Ok(None) => return Ok(false),
            Err(e) => return Err(error_message(&e)),
        };

        let payload = self
            .weather
            .fetch(coordinate)
            .await
            .map_err(|e| error_message(&e))?;

        let label = format!("Current location ({})", coordinate);
        self.state
            .set(WeatherUi::Content(content_from_payload(label, &payload)));
        Ok(true)
    }
}

impl std::fmt::Debug for WeatherViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherViewModel")
            .field("resolver", &self.resolver)
            .field("fallback", &self.fallback)
            .field("state", &self.state.current())
            .finish()
    }
}

fn error_message(err: &dyn std::error::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}
