use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Device location settings
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the Open-Meteo compatible API (without `/v1/forecast`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Coordinate used when the device location is not available
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,

    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,
}

fn default_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_fallback_latitude() -> f64 {
    55.7558
}

fn default_fallback_longitude() -> f64 {
    37.6173
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
        }
    }
}

/// Where the device location comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationProviderKind {
    /// Platform service when there is one (GeoClue on Linux)
    #[default]
    Auto,
    Geoclue,
    /// Fixed coordinate from `manual_latitude` / `manual_longitude`
    Manual,
    /// Never report a location
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Whether location access is granted. When false the fallback location is used.
    #[serde(default = "default_location_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub provider: LocationProviderKind,

    #[serde(default)]
    pub manual_latitude: Option<f64>,

    #[serde(default)]
    pub manual_longitude: Option<f64>,

    /// How long the platform service may take to produce a first fix
    #[serde(default = "default_fix_timeout")]
    pub fix_timeout_secs: u64,

    /// Application id reported to GeoClue
    #[serde(default = "default_desktop_id")]
    pub desktop_id: String,

    /// Ask for an exact fix; false settles for city-level accuracy
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,
}

fn default_location_enabled() -> bool {
    true
}

fn default_fix_timeout() -> u64 {
    30
}

fn default_desktop_id() -> String {
    "pogoda".to_string()
}

fn default_high_accuracy() -> bool {
    true
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: default_location_enabled(),
            provider: LocationProviderKind::default(),
            manual_latitude: None,
            manual_longitude: None,
            fix_timeout_secs: default_fix_timeout(),
            desktop_id: default_desktop_id(),
            high_accuracy: default_high_accuracy(),
        }
    }
}

impl LocationConfig {
    /// Manual coordinate, if both halves are set
    pub fn manual_coordinate(&self) -> Option<(f64, f64)> {
        self.manual_latitude.zip(self.manual_longitude)
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                tracing::warn!("Could not write default config to {}: {:#}", path.display(), e);
            }
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; validation errors fail the load.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            // An explicitly named file has to exist.
            Some(p) if !p.exists() => {
                return Err(ConfigError::NotFound(p.display().to_string()).into());
            }
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 300 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>5 minutes)",
            );
        }

        validate_coordinate(
            self.weather.fallback_latitude,
            self.weather.fallback_longitude,
            "weather.fallback",
            &mut result,
        );

        match (self.location.manual_latitude, self.location.manual_longitude) {
            (Some(lat), Some(lon)) => {
                validate_coordinate(lat, lon, "location.manual", &mut result)
            }
            (None, None) => {
                if self.location.provider == LocationProviderKind::Manual {
                    result.add_error(
                        "location.provider",
                        "Manual provider needs manual_latitude and manual_longitude",
                    );
                }
            }
            _ => result.add_error(
                "location.manual",
                "Set both manual_latitude and manual_longitude, or neither",
            ),
        }

        if self.location.fix_timeout_secs == 0 {
            result.add_warning(
                "location.fix_timeout_secs",
                "Location fix timeout is 0; device location will never resolve",
            );
        }

        if !self.location.enabled {
            result.add_warning("location.enabled", "Location disabled, using fallback location");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("pogoda");

        Ok(config_dir.join("config.toml"))
    }
}

fn validate_coordinate(lat: f64, lon: f64, field: &str, result: &mut ValidationResult) {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        result.add_error(
            format!("{}_latitude", field),
            format!("Latitude must be within -90..90, got {}", lat),
        );
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        result.add_error(
            format!("{}_longitude", field),
            format!("Longitude must be within -180..180, got {}", lon),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_default_fallback_is_moscow() {
        let config = Config::default();
        assert_eq!(config.weather.fallback_latitude, 55.7558);
        assert_eq!(config.weather.fallback_longitude, 37.6173);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.base_url = "ftp://api.open-meteo.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_request_timeout() {
        let mut config = Config::default();
        config.weather.request_timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_out_of_range_fallback() {
        let mut config = Config::default();
        config.weather.fallback_latitude = 91.0;
        let result = config.validate();
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "weather.fallback_latitude"));
    }

    #[test]
    fn test_manual_provider_requires_coordinates() {
        let mut config = Config::default();
        config.location.provider = LocationProviderKind::Manual;
        assert!(!config.validate().is_valid());

        config.location.manual_latitude = Some(59.93);
        assert!(!config.validate().is_valid());

        config.location.manual_longitude = Some(30.31);
        assert!(config.validate().is_valid());
        assert_eq!(config.location.manual_coordinate(), Some((59.93, 30.31)));
    }

    #[test]
    fn test_disabled_location_is_warning() {
        let mut config = Config::default();
        config.location.enabled = false;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "location.enabled"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pogoda").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.weather.base_url, "https://api.open-meteo.com");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[location]\nprovider = \"manual\"\nmanual_latitude = 59.93\nmanual_longitude = 30.31\n",
        )
        .unwrap();

        let (config, _) = Config::load_validated(Some(&path)).unwrap();
        assert_eq!(config.location.provider, LocationProviderKind::Manual);
        assert!(config.location.enabled);
        assert_eq!(config.weather.request_timeout_secs, 10);
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\nbase_url = \"nope\"\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("weather.base_url"));
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_high_accuracy_defaults_on() {
        let config: Config = toml::from_str("[location]\nhigh_accuracy = false\n").unwrap();
        assert!(!config.location.high_accuracy);
        assert!(Config::default().location.high_accuracy);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\nbase_url = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
