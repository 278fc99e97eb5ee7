use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, info};

use crate::departures::Departure;
use crate::error::{Error, Result};

const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Source of live departures for a station.
#[async_trait]
pub trait TransitSource {
    async fn fetch_departures(&self, station_id: &str, lookahead_minutes: u32)
        -> Result<Vec<Departure>>;
}

#[derive(Debug, Deserialize)]
struct DeparturesResponse {
    departures: Vec<HafasDeparture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HafasDeparture {
    planned_when: Option<DateTime<FixedOffset>>,
    delay: Option<i64>, // seconds
    direction: Option<String>,
    line: Option<HafasLine>,
}

#[derive(Debug, Deserialize)]
struct HafasLine {
    name: Option<String>,
}

/// Client for a `hafas-rest-api` deployment, e.g. `v6.db.transport.rest`.
pub struct HafasClient {
    client: reqwest::Client,
    base_url: String,
    tz: Tz,
}

impl HafasClient {
    pub fn new(base_url: &str, tz: Tz) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            tz,
        })
    }

    /// Converts API entries, dropping the ones lacking a line or a planned time.
    fn map_departures(&self, raw: Vec<HafasDeparture>) -> Vec<Departure> {
        raw.into_iter()
            .filter_map(|d| {
                let (Some(line), Some(planned)) = (d.line.and_then(|l| l.name), d.planned_when) else {
                    debug!("skipping departure without line or planned time");
                    return None;
                };

                Some(Departure {
                    line,
                    direction: d.direction.unwrap_or_default(),
                    scheduled: planned.with_timezone(&self.tz).naive_local(),
                    delay: d.delay.map(Duration::seconds),
                })
            })
            .collect()
    }
}

#[async_trait]
impl TransitSource for HafasClient {
    async fn fetch_departures(
        &self,
        station_id: &str,
        lookahead_minutes: u32,
    ) -> Result<Vec<Departure>> {
        let url = format!("{}/stops/{}/departures", self.base_url, station_id);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("duration", lookahead_minutes.to_string()),
                ("remarks", "false".to_owned()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Status {
                service: "transit API",
                status: response.status(),
            });
        }

        let body: DeparturesResponse = response.json().await?;
        let departures = self.map_departures(body.departures);
        info!(station = station_id, count = departures.len(), "fetched departures");

        Ok(departures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
        "departures": [
            {
                "tripId": "1|1",
                "when": "2024-05-10T16:07:00+02:00",
                "plannedWhen": "2024-05-10T16:05:00+02:00",
                "delay": 120,
                "direction": "Lausen",
                "line": { "name": "STR 1", "product": "tram" }
            },
            {
                "tripId": "1|2",
                "when": null,
                "plannedWhen": "2024-05-10T14:20:00Z",
                "delay": null,
                "direction": "Knautkleeberg",
                "line": { "name": "STR 3" }
            },
            {
                "tripId": "1|3",
                "when": null,
                "plannedWhen": null,
                "delay": null,
                "direction": "Lausen",
                "line": { "name": "STR 1" }
            },
            {
                "tripId": "1|4",
                "plannedWhen": "2024-05-10T16:30:00+02:00",
                "direction": "Gohlis"
            }
        ],
        "realtimeDataUpdatedAt": 1715349600
    }"#;

    fn client() -> HafasClient {
        HafasClient::new("https://v6.db.transport.rest/", chrono_tz::Europe::Berlin).unwrap()
    }

    #[test]
    fn maps_api_entries() {
        let body: DeparturesResponse = serde_json::from_str(SAMPLE).unwrap();

        let departures = client().map_departures(body.departures);

        assert_eq!(departures.len(), 2);
        assert_eq!(departures[0].line, "STR 1");
        assert_eq!(departures[0].direction, "Lausen");
        assert_eq!(
            departures[0].scheduled,
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap().and_hms_opt(16, 5, 0).unwrap()
        );
        assert_eq!(departures[0].delay, Some(Duration::seconds(120)));
    }

    #[test]
    fn planned_time_is_converted_to_station_time() {
        let body: DeparturesResponse = serde_json::from_str(SAMPLE).unwrap();

        let departures = client().map_departures(body.departures);

        assert_eq!(departures[1].line, "STR 3");
        assert_eq!(
            departures[1].scheduled,
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap().and_hms_opt(16, 20, 0).unwrap()
        );
        assert_eq!(departures[1].delay, None);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        assert_eq!(client().base_url, "https://v6.db.transport.rest");
    }
}
