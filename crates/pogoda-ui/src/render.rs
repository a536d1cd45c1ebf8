//! Plain-text rendering of [`WeatherUi`] for terminals.

use crate::state::{WeatherContent, WeatherUi};

pub const SOURCE_NOTE: &str = "Source: Open-Meteo";

pub fn render(state: &WeatherUi) -> String {
    match state {
        WeatherUi::Loading => "Loading weather…".to_string(),
        WeatherUi::Error { message } => format!("Error: {}", message),
        WeatherUi::Content(content) => render_card(content),
    }
}

fn render_card(content: &WeatherContent) -> String {
    [
        content.location_label.clone(),
        format!("Temperature: {} °C", content.temperature_c),
        format!("Humidity: {} %", content.humidity_pct),
        format!(
            "Wind: {} {} m/s ({}°)",
            content.wind_dir_text, content.wind_speed, content.wind_deg
        ),
        format!("Cloud cover: {} %", content.cloud_cover_pct),
        format!("Precipitation: {} mm", content.precip_mm),
        format!("Observed: {}", content.observed_at),
        SOURCE_NOTE.to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::content_from_payload;
    use pogoda_weather::WeatherPayload;

    #[test]
    fn test_render_loading_and_error() {
        assert_eq!(render(&WeatherUi::Loading), "Loading weather…");
        assert_eq!(
            render(&WeatherUi::Error {
                message: "Weather API returned HTTP 500".to_string()
            }),
            "Error: Weather API returned HTTP 500"
        );
    }

    #[test]
    fn test_render_card() {
        let payload = WeatherPayload {
            temperature_c: Some(-3.26),
            humidity_pct: Some(81.0),
            wind_speed_ms: Some(2.1),
            wind_dir_deg: Some(270.0),
            cloud_cover_pct: Some(88.0),
            precip_mm: Some(0.0),
            observed_at: None,
        };
        let text = render(&WeatherUi::Content(content_from_payload(
            "Fallback location",
            &payload,
        )));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Fallback location",
                "Temperature: -3.3 °C",
                "Humidity: 81 %",
                "Wind: W 2.1 m/s (270°)",
                "Cloud cover: 88 %",
                "Precipitation: 0.0 mm",
                "Observed: —",
                "Source: Open-Meteo",
            ]
        );
    }

    #[test]
    fn test_render_unknown_values() {
        let text = render(&WeatherUi::Content(content_from_payload(
            "Somewhere",
            &WeatherPayload::default(),
        )));
        assert!(text.contains("Temperature: — °C"));
        assert!(text.contains("Wind: — — m/s (0°)"));
    }
}
