use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::config::TemperatureKind;
use crate::error::{Error, Result};

const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast {
    pub current_weather: CurrentWeather,
    pub daily: Daily,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentWeather {
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Daily {
    pub time: Vec<NaiveDate>,
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
}

#[async_trait]
pub trait WeatherSource {
    /// Fails on transport errors and on any non-success HTTP status.
    async fn fetch_forecast(&self, latitude: f64, longitude: f64, timezone: &str)
        -> Result<Forecast>;
}

pub struct OpenMeteoClient {
    client: reqwest::Client,
    url: String,
}

impl OpenMeteoClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<Forecast> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_owned()),
                ("daily", "temperature_2m_max,precipitation_sum".to_owned()),
                ("timezone", timezone.to_owned()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Status {
                service: "weather API",
                status: response.status(),
            });
        }

        let forecast: Forecast = response.json().await?;
        info!(
            temperature = forecast.current_weather.temperature,
            days = forecast.daily.time.len(),
            "fetched forecast"
        );

        Ok(forecast)
    }
}

/// Rounds half to even, so 16.5 shows as 16°C.
fn celsius(temperature: f64) -> String {
    format!("{}°C", temperature.round_ties_even() as i64)
}

pub fn current_temperature(forecast: &Forecast) -> String {
    celsius(forecast.current_weather.temperature)
}

/// Maximum for `today`, `None` if the forecast doesn't cover that date.
pub fn today_max_temperature(forecast: &Forecast, today: NaiveDate) -> Option<String> {
    let index = forecast.daily.time.iter().position(|&date| date == today)?;
    let max = forecast.daily.temperature_2m_max.get(index).copied().flatten()?;

    Some(celsius(max))
}

pub fn temperature(forecast: &Forecast, kind: TemperatureKind, today: NaiveDate) -> Option<String> {
    match kind {
        TemperatureKind::Current => Some(current_temperature(forecast)),
        TemperatureKind::TodayMax => today_max_temperature(forecast, today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "latitude": 51.34,
        "longitude": 12.4,
        "timezone": "Europe/Berlin",
        "current_weather": { "temperature": 16.5, "windspeed": 7.2, "weathercode": 1 },
        "daily": {
            "time": ["2024-05-10", "2024-05-11"],
            "temperature_2m_max": [21.4, null],
            "precipitation_sum": [0.0, 1.2]
        }
    }"#;

    fn forecast() -> Forecast {
        serde_json::from_str(SAMPLE).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn current_temperature_rounds_half_to_even() {
        assert_eq!(current_temperature(&forecast()), "16°C");
    }

    #[test]
    fn negative_temperatures_keep_their_sign() {
        assert_eq!(celsius(-3.6), "-4°C");
        assert_eq!(celsius(-0.4), "0°C");
    }

    #[test]
    fn today_max_is_looked_up_by_date() {
        assert_eq!(today_max_temperature(&forecast(), day(10)), Some("21°C".to_owned()));
    }

    #[test]
    fn missing_date_or_value_is_absent() {
        assert_eq!(today_max_temperature(&forecast(), day(12)), None);
        assert_eq!(today_max_temperature(&forecast(), day(11)), None);
    }

    #[test]
    fn kind_selects_the_value() {
        let f = forecast();

        assert_eq!(temperature(&f, TemperatureKind::Current, day(10)), Some("16°C".to_owned()));
        assert_eq!(temperature(&f, TemperatureKind::TodayMax, day(10)), Some("21°C".to_owned()));
    }
}
