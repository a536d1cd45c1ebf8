//! Maps weather crate errors to pogoda_core::AppError for consistent user-facing messages.

use pogoda_core::{AppError, NetworkError, ReqwestErrorExt, WeatherError as CoreWeatherError};
use pogoda_weather::{LocationError, WeatherError};

pub fn weather_app_error(e: WeatherError) -> AppError {
    match e {
        WeatherError::Network(err) => AppError::Network(err.into_network_error()),
        WeatherError::Status { status } => AppError::Network(NetworkError::ServerError {
            status,
            message: format!("HTTP {}", status),
        }),
        WeatherError::Parse(msg) => AppError::Weather(CoreWeatherError::ApiError(msg)),
    }
}

pub fn location_app_error(e: LocationError) -> AppError {
    match e {
        LocationError::PermissionDenied => AppError::Weather(CoreWeatherError::PermissionDenied),
        LocationError::ServiceUnavailable => {
            AppError::Weather(CoreWeatherError::LocationFailed("service unavailable".into()))
        }
        LocationError::Timeout => {
            AppError::Weather(CoreWeatherError::LocationFailed("timed out".into()))
        }
        LocationError::Other(msg) => AppError::Weather(CoreWeatherError::LocationFailed(msg)),
    }
}
