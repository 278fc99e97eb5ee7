use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::future::Future;
use tracing::{debug, info};

use crate::cache::Cached;
use crate::config::Config;
use crate::departures::{departures_view, group_by_line, sort_by_next_departure, GroupedDepartures};
use crate::display::layout::Frame;
use crate::display::{framebuffer, Panel, PanelGuard};
use crate::error::Result;
use crate::schedule::Scheduler;
use crate::transit::TransitSource;
use crate::weather::{self, WeatherSource};

/// Polls both APIs on their own cadence and redraws the panel when what it
/// shows would change.
pub struct Controller<T, W, P>
where
    T: TransitSource,
    W: WeatherSource,
    P: Panel,
{
    config: Config,
    tz: Tz,
    transit: T,
    weather: W,
    panel: PanelGuard<P>,
    scheduler: Scheduler,
    departures: Cached<GroupedDepartures>,
    temperature: Cached<String>,
    last_frame: Option<Frame>,
}

impl<T, W, P> Controller<T, W, P>
where
    T: TransitSource,
    W: WeatherSource,
    P: Panel,
{
    pub fn new(config: Config, transit: T, weather: W, panel: P) -> Result<Self> {
        let tz = config.tz()?;
        let scheduler = Scheduler::from_config(&config.schedule);

        Ok(Self {
            config,
            tz,
            transit,
            weather,
            panel: PanelGuard::new(panel),
            scheduler,
            departures: Cached::new("departures"),
            temperature: Cached::new("temperature"),
            last_frame: None,
        })
    }

    /// Loops until `shutdown` resolves or a step fails. The panel is cleared
    /// either way once the controller is dropped.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("refresh loop started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(());
                }
                result = self.step() => result?,
            }
        }
    }

    async fn step(&mut self) -> Result<()> {
        self.tick(Utc::now()).await?;
        tokio::time::sleep(self.scheduler.next_wake(Utc::now())).await;

        Ok(())
    }

    /// Runs whatever is due at `now`: polls first, then the redraw.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        let transit_due = self.scheduler.transit_due(now);
        let weather_due = self.scheduler.weather_due(now);

        if transit_due {
            self.poll_departures(now).await;
            self.scheduler.transit_polled(now);
        }

        if weather_due {
            self.poll_weather(now).await;
            self.scheduler.weather_polled(now);
        }

        // Restarts even when there is nothing to draw yet.
        if self.scheduler.render_due(now) {
            self.render(now)?;
            self.scheduler.rendered(now);
        }

        Ok(())
    }

    async fn poll_departures(&mut self, now: DateTime<Utc>) {
        let outcome = self
            .transit
            .fetch_departures(&self.config.station_id, self.config.lookahead_minutes)
            .await
            .map(group_by_line);

        self.departures.refresh(outcome, now);
    }

    async fn poll_weather(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&self.tz).date_naive();
        let kind = self.config.temperature;
        let outcome = self
            .weather
            .fetch_forecast(self.config.latitude, self.config.longitude, &self.config.timezone)
            .await
            .map_err(|e| e.to_string())
            .and_then(|forecast| {
                weather::temperature(&forecast, kind, today)
                    .ok_or_else(|| format!("forecast has no temperature for {}", today))
            });

        self.temperature.refresh(outcome, now);
    }

    /// Draws the board for `now` unless the panel already shows exactly that.
    /// Returns whether the panel was drawn.
    pub fn render(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let Some(grouped) = self.departures.get() else {
            debug!("no departures yet, nothing to draw");
            return Ok(false);
        };

        let view = departures_view(grouped, &self.config.routes, now, self.tz);
        let clock = now.with_timezone(&self.tz).format("%H:%M").to_string();
        let frame = Frame::new(
            sort_by_next_departure(view),
            clock,
            self.temperature.get().cloned(),
        );

        if self.last_frame.as_ref() == Some(&frame) {
            debug!("board unchanged, skipping redraw");
            return Ok(false);
        }

        let mut canvas = framebuffer();
        match frame.draw(&mut canvas) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        self.panel.show(&canvas)?;
        debug!(rows = ?frame.rows, "board redrawn");
        self.last_frame = Some(frame);

        Ok(true)
    }
}
