use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use std::collections::HashMap;
use tracing::debug;

use crate::config::TrackedRoute;

/// One departure as reported by the transit API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub line: String, // human readable line name, e.g. "STR 1"
    pub direction: String,
    /// Wall-clock time in the station timezone. On the autumn DST night a
    /// time inside the repeated hour resolves to its first occurrence, so
    /// departures in the second pass of that hour come out 60 minutes early.
    pub scheduled: NaiveDateTime,
    /// Time added on top of `scheduled`, `None` if the API doesn't know.
    pub delay: Option<Duration>,
}

/// Departures keyed by line name, in API order within each line.
pub type GroupedDepartures = HashMap<String, Vec<Departure>>;

/// Display key with the minutes until its next departures.
pub type RouteMinutes = (String, Vec<u32>);

pub fn group_by_line(departures: Vec<Departure>) -> GroupedDepartures {
    departures
        .into_iter()
        .map(|departure| (departure.line.clone(), departure))
        .into_group_map()
}

/// Departures of `line` heading to any of `directions`, in original order.
/// An unknown line simply has no departures.
pub fn filter_by_direction<'a>(
    grouped: &'a GroupedDepartures,
    line: &str,
    directions: &[String],
) -> Vec<&'a Departure> {
    grouped
        .get(line)
        .map(|departures| {
            departures
                .iter()
                .filter(|d| directions.contains(&d.direction))
                .collect()
        })
        .unwrap_or_default()
}

/// Whole minutes from `now` until each departure (delay included), ascending.
/// Departures leaving now or in the past are dropped.
pub fn minutes_until(departures: &[&Departure], now: DateTime<Utc>, tz: Tz) -> Vec<u32> {
    let mut minutes: Vec<u32> = departures
        .iter()
        .filter_map(|departure| {
            // Ambiguous local times (autumn DST switch) resolve to the first
            // occurrence, times inside the spring gap don't exist.
            let Some(scheduled) = tz.from_local_datetime(&departure.scheduled).earliest() else {
                debug!(scheduled = %departure.scheduled, "skipping non-existent local time");
                return None;
            };
            let leaves = scheduled + departure.delay.unwrap_or_else(Duration::zero);
            let millis = (leaves.with_timezone(&Utc) - now).num_milliseconds();

            match millis.div_euclid(60_000) {
                m if m > 0 => u32::try_from(m).ok(),
                _ => None,
            }
        })
        .collect();

    minutes.sort_unstable();
    minutes
}

pub fn next_departures(
    grouped: &GroupedDepartures,
    route: &TrackedRoute,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<u32> {
    let filtered = filter_by_direction(grouped, &route.line, std::slice::from_ref(&route.direction));

    minutes_until(&filtered, now, tz)
}

/// Minutes for every tracked route, in configuration order.
pub fn departures_view(
    grouped: &GroupedDepartures,
    routes: &[TrackedRoute],
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<RouteMinutes> {
    routes
        .iter()
        .map(|route| (route.key.clone(), next_departures(grouped, route, now, tz)))
        .collect()
}

/// Soonest departure first. Routes without departures go last, ties keep
/// their original order.
pub fn sort_by_next_departure(view: Vec<RouteMinutes>) -> Vec<RouteMinutes> {
    view.into_iter()
        .sorted_by_key(|(_, minutes)| match minutes.first() {
            Some(&first) => (false, first),
            None => (true, 0),
        })
        .collect()
}
