//! Builds the weather services from configuration.

use std::sync::Arc;
use std::time::Duration;

use pogoda_core::{AppError, Config, LocationProviderKind};
use pogoda_weather::{
    platform_locator, Coordinate, FixedLocator, LocationPriority, LocationResolver, NoLocator,
    PlatformLocator, WeatherProvider,
};

use crate::error_mapping::weather_app_error;
use crate::view_model::WeatherViewModel;

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// `Some(false)` forces the fallback location.
    pub location_permitted: Option<bool>,
    /// Use this coordinate as the device location.
    pub manual_location: Option<Coordinate>,
}

pub struct AppServices {
    provider: Arc<WeatherProvider>,
    resolver: LocationResolver,
    fallback: Coordinate,
    location_permitted: bool,
}

impl AppServices {
    pub fn from_config(config: &Config, options: &LaunchOptions) -> Result<Self, AppError> {
        let provider = WeatherProvider::with_base_url(
            &config.weather.base_url,
            Duration::from_secs(config.weather.request_timeout_secs),
        )
        .map_err(weather_app_error)?;

        let locator = select_locator(config, options);
        let priority = if config.location.high_accuracy {
            LocationPriority::HighAccuracy
        } else {
            LocationPriority::Balanced
        };
        tracing::info!("Using {} location provider ({:?})", locator.name(), priority);

        Ok(Self {
            provider: Arc::new(provider),
            resolver: LocationResolver::new(locator).with_priority(priority),
            fallback: Coordinate::new(
                config.weather.fallback_latitude,
                config.weather.fallback_longitude,
            ),
            location_permitted: options
                .location_permitted
                .unwrap_or(config.location.enabled),
        })
    }

    pub fn location_permitted(&self) -> bool {
        self.location_permitted
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn view_model(&self) -> WeatherViewModel {
        WeatherViewModel::new(self.provider.clone(), self.resolver.clone())
            .with_fallback(self.fallback)
    }
}

fn select_locator(config: &Config, options: &LaunchOptions) -> Arc<dyn PlatformLocator> {
    if let Some(coordinate) = options.manual_location {
        return Arc::new(FixedLocator::new(coordinate));
    }

    let location = &config.location;
    let fix_timeout = Duration::from_secs(location.fix_timeout_secs);
    match location.provider {
        LocationProviderKind::Auto => match location.manual_coordinate() {
            Some((lat, lon)) => Arc::new(FixedLocator::new(Coordinate::new(lat, lon))),
            None => platform_locator(&location.desktop_id, fix_timeout),
        },
        LocationProviderKind::Geoclue => geoclue_locator(&location.desktop_id, fix_timeout),
        LocationProviderKind::Manual => match location.manual_coordinate() {
            Some((lat, lon)) => Arc::new(FixedLocator::new(Coordinate::new(lat, lon))),
            None => {
                tracing::warn!("Manual location provider without coordinates");
                Arc::new(NoLocator)
            }
        },
        LocationProviderKind::None => Arc::new(NoLocator),
    }
}

#[cfg(target_os = "linux")]
fn geoclue_locator(desktop_id: &str, fix_timeout: Duration) -> Arc<dyn PlatformLocator> {
    Arc::new(pogoda_weather::geoclue::GeoClueLocator::new(desktop_id, fix_timeout))
}

#[cfg(not(target_os = "linux"))]
fn geoclue_locator(_desktop_id: &str, _fix_timeout: Duration) -> Arc<dyn PlatformLocator> {
    tracing::warn!("GeoClue is only available on Linux");
    Arc::new(NoLocator)
}
