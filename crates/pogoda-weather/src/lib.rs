//! Weather service for Pogoda
//!
//! Provides current conditions via the Open-Meteo API and best-effort device
//! location through the platform location service.

pub mod location;
pub mod provider;
pub mod types;

#[cfg(target_os = "linux")]
pub mod geoclue;
#[cfg(windows)]
pub mod windows_location;

pub use location::{
    platform_locator, FixedLocator, LocationCallback, LocationOutcome, LocationResolver,
    NoLocator, PlatformLocator,
};
pub use provider::{WeatherProvider, WeatherSource};
pub use types::*;
