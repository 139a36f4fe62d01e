use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::sync::mpsc::Sender;

#[derive(Clone, Debug)]
pub(crate) struct WeatherReport {
    pub(crate) label: String,
    pub(crate) temp_c: f64,
    pub(crate) wind_kph: f64,
    pub(crate) summary: String,
}

#[derive(Debug)]
pub(crate) enum WeatherEvent {
    /// The city string that was queried, plus the result.
    Report(String, WeatherReport),
    Failed(String),
}

#[derive(Deserialize)]
struct GeoResponse {
    results: Option<Vec<GeoHit>>,
}

#[derive(Clone, Deserialize)]
struct GeoHit {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
}

/// WMO weather code to a short text category; unknown codes pass through raw.
pub(crate) fn describe_code(code: i32) -> String {
    match code {
        0 => "Clear".to_string(),
        1..=3 => "Cloudy".to_string(),
        45 | 48 => "Fog".to_string(),
        51 | 53 | 55 | 56 | 57 => "Drizzle".to_string(),
        61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => "Rain".to_string(),
        71 | 73 | 75 | 77 | 85 | 86 => "Snow".to_string(),
        95 | 96 | 99 => "Thunderstorm".to_string(),
        other => other.to_string(),
    }
}

/// Two sequential GETs: geocode the city, then fetch current conditions.
/// Either step failing surfaces as one error; no retries, no timeout tuning.
pub(crate) fn lookup(city: &str) -> Result<WeatherReport> {
    let client = reqwest::blocking::Client::new();

    let geo: GeoResponse = client
        .get("https://geocoding-api.open-meteo.com/v1/search")
        .query(&[("name", city), ("count", "1")])
        .send()
        .context("geocoding request failed")?
        .error_for_status()
        .context("geocoding request rejected")?
        .json()
        .context("geocoding JSON parse failed")?;

    let hit = geo
        .results
        .and_then(|v| v.into_iter().next())
        .ok_or_else(|| anyhow!("no match for \"{city}\""))?;

    let fc: ForecastResponse = client
        .get("https://api.open-meteo.com/v1/forecast")
        .query(&[
            ("latitude", hit.latitude.to_string()),
            ("longitude", hit.longitude.to_string()),
            ("current_weather", "true".to_string()),
        ])
        .send()
        .context("forecast request failed")?
        .error_for_status()
        .context("forecast request rejected")?
        .json()
        .context("forecast JSON parse failed")?;

    let label = match &hit.country {
        Some(c) if !c.is_empty() => format!("{}, {}", hit.name, c),
        _ => hit.name.clone(),
    };
    let cw = fc.current_weather;
    Ok(WeatherReport {
        label,
        temp_c: cw.temperature,
        wind_kph: cw.windspeed,
        summary: describe_code(cw.weathercode),
    })
}

/// Runs the lookup off the UI thread; the app polls the channel each frame.
pub(crate) fn spawn_lookup(city: String, tx: Sender<WeatherEvent>) {
    std::thread::spawn(move || {
        let event = match lookup(&city) {
            Ok(report) => WeatherEvent::Report(city, report),
            Err(e) => WeatherEvent::Failed(format!("{e:#}")),
        };
        let _ = tx.send(event);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_categories() {
        assert_eq!(describe_code(0), "Clear");
        assert_eq!(describe_code(1), "Cloudy");
        assert_eq!(describe_code(3), "Cloudy");
        assert_eq!(describe_code(45), "Fog");
        assert_eq!(describe_code(48), "Fog");
        assert_eq!(describe_code(55), "Drizzle");
        assert_eq!(describe_code(57), "Drizzle");
        assert_eq!(describe_code(61), "Rain");
        assert_eq!(describe_code(82), "Rain");
        assert_eq!(describe_code(71), "Snow");
        assert_eq!(describe_code(86), "Snow");
        assert_eq!(describe_code(95), "Thunderstorm");
        assert_eq!(describe_code(99), "Thunderstorm");
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(describe_code(42), "42");
        assert_eq!(describe_code(-1), "-1");
    }
}
