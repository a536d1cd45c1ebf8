//! Turns a [`WeatherPayload`] into display strings.

use chrono::NaiveDateTime;
use pogoda_weather::WeatherPayload;

use crate::state::WeatherContent;

/// Shown for any value the provider did not report.
pub const UNKNOWN: &str = "—";

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Round half up (-0.25 -> -0.2). Never returns negative zero.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor() + 0.0
}

/// One decimal place, e.g. `21.46` -> `"21.5"`.
pub fn one_decimal(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.1}", round_half_up(v * 10.0) / 10.0),
        None => UNKNOWN.to_string(),
    }
}

/// Nearest whole number, e.g. `63.2` -> `"63"`.
pub fn whole(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.0}", round_half_up(v)),
        None => UNKNOWN.to_string(),
    }
}

/// Wind direction in whole degrees; 0 when unknown or not representable.
pub fn wind_degrees(value: Option<f64>) -> i32 {
    value
        .map(round_half_up)
        .filter(|v| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(v))
        .map(|v| v as i32)
        .unwrap_or(0)
}

/// Observation time as `YYYY-MM-DD HH:MM` local time.
pub fn observed(value: Option<NaiveDateTime>) -> String {
    match value {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// 16-point compass label for a bearing in degrees.
///
/// Sectors start at their label (N covers [0, 22.5)), and any bearing is
/// normalized into [0, 360) first.
pub fn compass_point(degrees: f64) -> Option<&'static str> {
    if !degrees.is_finite() {
        return None;
    }
    let normalized = (degrees % 360.0 + 360.0) % 360.0;
    let index = (normalized / 22.5).floor() as usize % COMPASS_POINTS.len();
    Some(COMPASS_POINTS[index])
}

/// Build the `Content` state for a payload.
pub fn content_from_payload(label: impl Into<String>, payload: &WeatherPayload) -> WeatherContent {
    WeatherContent {
        location_label: label.into(),
        temperature_c: one_decimal(payload.temperature_c),
        humidity_pct: whole(payload.humidity_pct),
        wind_speed: one_decimal(payload.wind_speed_ms),
        wind_deg: wind_degrees(payload.wind_dir_deg),
        wind_dir_text: payload
            .wind_dir_deg
            .and_then(compass_point)
            .unwrap_or(UNKNOWN)
            .to_string(),
        cloud_cover_pct: whole(payload.cloud_cover_pct),
        precip_mm: one_decimal(payload.precip_mm),
        observed_at: observed(payload.observed_at),
    }
}
