use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{Error, Result};

const CONF_DIR: &str = "departure-board";
const CONF_FILE: &str = "config.yaml";
const LOG_FILE: &str = "departure-board.log";
const CONF_ENV: &str = "DEPARTURE_BOARD_CONFIG";

/// A (line, direction) pair shown in one row of the board under `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRoute {
    pub key: String,
    pub line: String,
    pub direction: String,
}

impl TrackedRoute {
    pub fn new(key: &str, line: &str, direction: &str) -> Self {
        Self {
            key: key.to_owned(),
            line: line.to_owned(),
            direction: direction.to_owned(),
        }
    }
}

/// Which forecast value ends up on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureKind {
    Current,
    TodayMax,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ScheduleConfig {
    /// Independent timers for both polls and the redraw.
    Interval {
        departures_secs: u64,
        weather_secs: u64,
        render_secs: u64,
    },
    /// Poll `lead_secs` before every full minute, redraw on the minute.
    MinuteAligned { lead_secs: u64, weather_secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Auto,
    Hardware,
    Emulator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: Backend,
    pub brightness: u8,
    pub hardware_mapping: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            brightness: 80,
            hardware_mapping: "adafruit-hat".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub path: PathBuf,
    pub max_bytes: usize,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        let mut path = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
        path.push(CONF_DIR);
        path.push(LOG_FILE);

        Self {
            path,
            max_bytes: 1024 * 1024,
            max_files: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub station_id: String,
    pub lookahead_minutes: u32,
    pub transit_api_url: String,
    pub routes: Vec<TrackedRoute>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub weather_api_url: String,
    pub temperature: TemperatureKind,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

impl Default for Config {
    /// Hermann-Liebmann-Str./Eisenbahnstr. in Leipzig, trams towards the city.
    fn default() -> Self {
        Self {
            station_id: "954125".to_owned(),
            lookahead_minutes: 60,
            transit_api_url: "https://v6.db.transport.rest".to_owned(),
            routes: vec![
                TrackedRoute::new("1", "STR 1", "Lausen"),
                TrackedRoute::new("3", "STR 3", "Knautkleeberg"),
                TrackedRoute::new("8", "STR 8", "Grünau-Nord"),
                TrackedRoute::new("70", "Bus 70", "Markkleeberg, S-Bf."),
            ],
            latitude: 51.34549642077572,
            longitude: 12.405958803670908,
            timezone: "Europe/Berlin".to_owned(),
            weather_api_url: "https://api.open-meteo.com/v1/forecast".to_owned(),
            temperature: TemperatureKind::Current,
            schedule: ScheduleConfig::Interval {
                departures_secs: 120,
                weather_secs: 6 * 60 * 60,
                render_secs: 5,
            },
            display: DisplayConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file at `path`, writing the default one first if
    /// there is none. Returns whether the default was written.
    pub async fn load(path: &Path) -> Result<(Self, bool)> {
        let created = !path.exists();

        let config: Self = if created {
            if let Some(dir) = path.parent() {
                Self::create_conf_dir(dir).await?;
            }

            let config = Self::default();
            config.save(path).await?;

            config
        } else {
            let file_content = fs::read_to_string(path).await?;
            serde_yaml::from_str(&file_content)?
        };

        config.validate()?;

        Ok((config, created))
    }

    /// Config file location, `DEPARTURE_BOARD_CONFIG` wins over the platform
    /// config directory.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONF_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir().ok_or(Error::NoConfigDir)?;
        path.push(CONF_DIR);
        path.push(CONF_FILE);

        Ok(path)
    }

    pub fn log_summary(&self) {
        info!(
            station = %self.station_id,
            lookahead = self.lookahead_minutes,
            timezone = %self.timezone,
            schedule = ?self.schedule,
            "config"
        );

        for route in &self.routes {
            info!(
                key = %route.key,
                line = %route.line,
                direction = %route.direction,
                "tracking route"
            );
        }
    }

    async fn create_conf_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }

        Ok(())
    }

    /// Saves config (serialize) to config YAML file.
    async fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?).await?;

        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| Error::Timezone(self.timezone.clone()))
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;

        if self.routes.is_empty() {
            return Err(Error::InvalidConfig("no routes configured".to_owned()));
        }

        let zero_interval = match self.schedule {
            ScheduleConfig::Interval {
                departures_secs,
                weather_secs,
                render_secs,
            } => departures_secs == 0 || weather_secs == 0 || render_secs == 0,
            ScheduleConfig::MinuteAligned {
                lead_secs,
                weather_secs,
            } => {
                if lead_secs >= 60 {
                    return Err(Error::InvalidConfig(format!(
                        "lead_secs must be below 60, got {}",
                        lead_secs
                    )));
                }
                weather_secs == 0
            }
        };

        if zero_interval {
            return Err(Error::InvalidConfig(
                "schedule intervals must be non-zero".to_owned(),
            ));
        }

        if self.log.max_files == 0 || self.log.max_bytes == 0 {
            return Err(Error::InvalidConfig(
                "log rotation limits must be non-zero".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let yaml = r#"
station_id: "8010205"
routes:
  - key: "S1"
    line: "S 1"
    direction: "Stötteritz"
schedule:
  policy: minute_aligned
  lead_secs: 10
  weather_secs: 3600
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.station_id, "8010205");
        assert_eq!(config.routes, vec![TrackedRoute::new("S1", "S 1", "Stötteritz")]);
        assert_eq!(config.lookahead_minutes, 60);
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(
            config.schedule,
            ScheduleConfig::MinuteAligned {
                lead_secs: 10,
                weather_secs: 3600
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let config = Config {
            timezone: "Mars/Olympus_Mons".to_owned(),
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(Error::Timezone(_))));
    }

    #[test]
    fn lead_of_a_minute_is_rejected() {
        let config = Config {
            schedule: ScheduleConfig::MinuteAligned {
                lead_secs: 60,
                weather_secs: 3600,
            },
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!("departure-board-test-{}", std::process::id()));
        path.push(CONF_FILE);

        let (created, was_created) = Config::load(&path).await.unwrap();
        let (loaded, was_created_again) = Config::load(&path).await.unwrap();

        assert!(was_created);
        assert!(!was_created_again);
        assert_eq!(created, Config::default());
        assert_eq!(loaded, created);

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).unwrap();
        }
    }

    #[test]
    fn empty_routes_are_rejected() {
        let config = Config {
            routes: vec![],
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
