use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Fixed coordinate used when the device location is unavailable (Moscow).
    pub const FALLBACK: Coordinate = Coordinate {
        latitude: 55.7558,
        longitude: 37.6173,
    };

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions for one coordinate, as reported by the provider.
///
/// Every measurement is optional: a field the provider omits (or sends as
/// `null`) stays `None` and is never replaced by zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_dir_deg: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub precip_mm: Option<f64>,
    /// Provider timestamp of the observation, in the location's local time
    pub observed_at: Option<NaiveDateTime>,
}

/// Accuracy hint passed to the platform location service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationPriority {
    #[default]
    HighAccuracy,
    Balanced,
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API returned HTTP {status}")]
    Status { status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
}
