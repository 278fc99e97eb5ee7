use chrono::{DateTime, Utc};
use std::fmt::Display;
use tracing::{debug, error};

/// Last successfully fetched value. A failed refresh never drops it.
#[derive(Debug)]
pub struct Cached<T> {
    name: &'static str,
    value: Option<T>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl<T> Cached<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value: None,
            refreshed_at: None,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[cfg(test)]
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Stores the outcome of a fetch.
    pub fn refresh<E: Display>(&mut self, outcome: Result<T, E>, now: DateTime<Utc>) {
        match outcome {
            Ok(value) => {
                debug!(cache = self.name, "refreshed");
                self.value = Some(value);
                self.refreshed_at = Some(now);
            }
            Err(e) => {
                error!(
                    cache = self.name,
                    stale_since = ?self.refreshed_at,
                    "refresh failed, keeping last value: {}",
                    e
                );
            }
        }
    }
}
