//! Open-Meteo current-conditions client.

use crate::types::{Coordinate, WeatherError, WeatherPayload};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const FORECAST_PATH: &str = "/v1/forecast";
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,cloud_cover,wind_speed_10m,wind_direction_10m";
const USER_AGENT: &str = concat!("pogoda/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce current conditions for a coordinate.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// One request, no retry, no caching.
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherPayload, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[allow(dead_code)]
    latitude: Option<f64>,
    #[allow(dead_code)]
    longitude: Option<f64>,
    current: Option<CurrentBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentBlock {
    time: Option<String>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    precipitation: Option<f64>,
    cloud_cover: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
}

impl From<ForecastResponse> for WeatherPayload {
    fn from(response: ForecastResponse) -> Self {
        let current = response.current.unwrap_or_default();
        WeatherPayload {
            temperature_c: current.temperature_2m,
            humidity_pct: current.relative_humidity_2m,
            wind_speed_ms: current.wind_speed_10m,
            wind_dir_deg: current.wind_direction_10m,
            cloud_cover_pct: current.cloud_cover,
            precip_mm: current.precipitation,
            observed_at: current.time.as_deref().and_then(parse_local_time),
        }
    }
}

/// Open-Meteo reports `current.time` as local ISO-8601, usually without seconds.
fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherProvider {
    /// Client for any Open-Meteo compatible endpoint.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherPayload, WeatherError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Forecast request returned status {}", status);
            return Err(WeatherError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        tracing::debug!(
            "Fetched current conditions for {} (observed {:?})",
            coordinate,
            parsed.current.as_ref().and_then(|c| c.time.as_deref())
        );

        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> WeatherProvider {
        WeatherProvider::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "55.7558"))
            .and(query_param("longitude", "37.6173"))
            .and(query_param("current", CURRENT_FIELDS))
            .and(query_param("timezone", "auto"))
            .and(query_param("wind_speed_unit", "ms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 55.75,
                "longitude": 37.625,
                "current": {
                    "time": "2026-01-15T14:30",
                    "temperature_2m": -3.26,
                    "relative_humidity_2m": 81,
                    "precipitation": 0.0,
                    "cloud_cover": 88,
                    "wind_speed_10m": 2.1,
                    "wind_direction_10m": 270
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let payload = provider_for(&mock_server)
            .fetch(Coordinate::FALLBACK)
            .await
            .unwrap();

        assert_eq!(payload.temperature_c, Some(-3.26));
        assert_eq!(payload.humidity_pct, Some(81.0));
        assert_eq!(payload.precip_mm, Some(0.0));
        assert_eq!(payload.cloud_cover_pct, Some(88.0));
        assert_eq!(payload.wind_speed_ms, Some(2.1));
        assert_eq!(payload.wind_dir_deg, Some(270.0));
        assert_eq!(
            payload.observed_at.map(|t| t.to_string()),
            Some("2026-01-15 14:30:00".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_and_null_fields_stay_absent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "temperature_2m": 12.0,
                    "wind_direction_10m": null,
                    "time": "not a timestamp"
                }
            })))
            .mount(&mock_server)
            .await;

        let payload = provider_for(&mock_server)
            .fetch(Coordinate::new(10.0, 20.0))
            .await
            .unwrap();

        assert_eq!(payload.temperature_c, Some(12.0));
        assert_eq!(payload.humidity_pct, None);
        assert_eq!(payload.wind_dir_deg, None);
        assert_eq!(payload.precip_mm, None);
        assert_eq!(payload.observed_at, None);
    }

    #[tokio::test]
    async fn test_missing_current_block() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"latitude": 1.0, "longitude": 2.0})),
            )
            .mount(&mock_server)
            .await;

        let payload = provider_for(&mock_server)
            .fetch(Coordinate::new(1.0, 2.0))
            .await
            .unwrap();

        assert_eq!(payload, WeatherPayload::default());
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server).fetch(Coordinate::FALLBACK).await;

        match result {
            Err(WeatherError::Status { status: 503 }) => {}
            other => panic!("expected HTTP 503, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"current\": [1, 2"))
            .mount(&mock_server)
            .await;

        let result = provider_for(&mock_server).fetch(Coordinate::FALLBACK).await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on a port once its listener is dropped.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            WeatherProvider::with_base_url(&format!("http://{}", addr), Duration::from_secs(2))
                .unwrap();
        let result = provider.fetch(Coordinate::FALLBACK).await;

        match result {
            Err(WeatherError::Network(e)) => assert!(e.is_connect(), "unexpected error: {e}"),
            other => panic!("expected a transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let provider =
            WeatherProvider::with_base_url("https://example.test/", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url(), "https://example.test");
    }
}
