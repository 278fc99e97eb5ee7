use chrono::{DateTime, Duration, Utc};

use crate::config::ScheduleConfig;

/// Longest the loop sleeps between two checks.
pub const TICK: std::time::Duration = std::time::Duration::from_secs(1);

const MINUTE_MS: i64 = 60_000;

/// Fires once `period` has passed since it was last reset. Never reset means due.
#[derive(Debug, Clone)]
pub struct Timer {
    period: Duration,
    last: Option<DateTime<Utc>>,
}

impl Timer {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last.map_or(true, |last| now - last >= self.period)
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.last = Some(now);
    }

    fn until_due(&self, now: DateTime<Utc>) -> Duration {
        self.last
            .map_or(Duration::zero(), |last| last + self.period - now)
            .max(Duration::zero())
    }
}

/// Decides when to poll the transit and weather APIs and when to redraw.
#[derive(Debug, Clone)]
pub enum Scheduler {
    Interval {
        transit: Timer,
        weather: Timer,
        render: Timer,
    },
    MinuteAligned {
        lead: Duration,
        weather: Timer,
        /// Minute (unix minutes) the last transit poll prepared.
        polled_for: Option<i64>,
        rendered_in: Option<i64>,
    },
}

fn minute_of(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().div_euclid(MINUTE_MS)
}

fn until_next_minute(now: DateTime<Utc>) -> Duration {
    Duration::milliseconds(MINUTE_MS - now.timestamp_millis().rem_euclid(MINUTE_MS))
}

impl Scheduler {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        let secs = |s: u64| Duration::seconds(s as i64);

        match *config {
            ScheduleConfig::Interval {
                departures_secs,
                weather_secs,
                render_secs,
            } => Scheduler::Interval {
                transit: Timer::new(secs(departures_secs)),
                weather: Timer::new(secs(weather_secs)),
                render: Timer::new(secs(render_secs)),
            },
            ScheduleConfig::MinuteAligned {
                lead_secs,
                weather_secs,
            } => Scheduler::MinuteAligned {
                lead: secs(lead_secs),
                weather: Timer::new(secs(weather_secs)),
                polled_for: None,
                rendered_in: None,
            },
        }
    }

    /// Inside the last `lead` before a full minute.
    fn in_poll_window(lead: Duration, now: DateTime<Utc>) -> bool {
        until_next_minute(now) <= lead
    }

    pub fn transit_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            Scheduler::Interval { transit, .. } => transit.is_due(now),
            Scheduler::MinuteAligned {
                lead, polled_for, ..
            } => match polled_for {
                None => true,
                Some(minute) => {
                    Self::in_poll_window(*lead, now) && *minute != minute_of(now) + 1
                }
            },
        }
    }

    pub fn transit_polled(&mut self, now: DateTime<Utc>) {
        match self {
            Scheduler::Interval { transit, .. } => transit.reset(now),
            Scheduler::MinuteAligned {
                lead, polled_for, ..
            } => {
                let upcoming = if Self::in_poll_window(*lead, now) {
                    minute_of(now) + 1
                } else {
                    minute_of(now)
                };
                *polled_for = Some(upcoming);
            }
        }
    }

    pub fn weather_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            Scheduler::Interval { weather, .. } => weather.is_due(now),
            // Piggybacks on the transit poll once its own interval is over.
            Scheduler::MinuteAligned { weather, .. } => {
                weather.last.is_none() || (weather.is_due(now) && self.transit_due(now))
            }
        }
    }

    pub fn weather_polled(&mut self, now: DateTime<Utc>) {
        match self {
            Scheduler::Interval { weather, .. } | Scheduler::MinuteAligned { weather, .. } => {
                weather.reset(now)
            }
        }
    }

    pub fn render_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            Scheduler::Interval { render, .. } => render.is_due(now),
            Scheduler::MinuteAligned { rendered_in, .. } => *rendered_in != Some(minute_of(now)),
        }
    }

    pub fn rendered(&mut self, now: DateTime<Utc>) {
        match self {
            Scheduler::Interval { render, .. } => render.reset(now),
            Scheduler::MinuteAligned { rendered_in, .. } => *rendered_in = Some(minute_of(now)),
        }
    }

    /// How long to sleep before something may be due again, at most [`TICK`].
    pub fn next_wake(&self, now: DateTime<Utc>) -> std::time::Duration {
        let wait = match self {
            Scheduler::Interval {
                transit,
                weather,
                render,
            } => transit
                .until_due(now)
                .min(weather.until_due(now))
                .min(render.until_due(now)),
            Scheduler::MinuteAligned { lead, .. } => {
                let boundary = until_next_minute(now);
                if boundary > *lead {
                    boundary - *lead
                } else {
                    boundary
                }
            }
        };

        wait.to_std().unwrap_or(std::time::Duration::ZERO).min(TICK)
    }
}
