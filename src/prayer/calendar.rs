use super::aladhan::UpstreamError;
use super::types::{Location, MonthCalendar};
use super::{CalendarProvider, PrayerError};
use crate::cache::TtlCache;
use crate::validation::{require_month, require_year};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// Builds the cache key for one month of one location.
///
/// Coordinates are rounded to 4 decimals (~11 m) so jitter between
/// geolocation reads lands on the same entry. City and country are kept
/// case-sensitive but percent-encoded, so a `|` or `:` inside a name can not
/// make two different locations share a key.
pub fn calendar_cache_key(location: &Location, year: i32, month: u32) -> String {
    match location {
        Location::ByCoordinates {
            latitude,
            longitude,
        } => format!(
            "cal:coords:{},{}:{}-{}",
            fixed4(*latitude),
            fixed4(*longitude),
            year,
            month
        ),
        Location::ByCity { city, country } => format!(
            "cal:city:{}|{}:{}-{}",
            urlencoding::encode(city),
            urlencoding::encode(country),
            year,
            month
        ),
    }
}

fn fixed4(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // + 0.0 folds -0.0 into 0.0
    format!("{:.4}", rounded + 0.0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
        2 => 28,
        _ => 0,
    }
}

/// The calendar month after `(year, month)`; December rolls into January.
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Resolves one month of prayer times for a location, cache first.
pub struct MonthFetcher {
    provider: Arc<dyn CalendarProvider>,
    cache: TtlCache,
    ttl: Duration,
}

impl MonthFetcher {
    pub fn new(provider: Arc<dyn CalendarProvider>, cache: TtlCache, ttl: Duration) -> Self {
        Self {
            provider,
            cache,
            ttl,
        }
    }

    /// With `bypass_cache` the cache read is skipped but the fresh result is
    /// still written back, so a refresh updates what later reads see.
    pub async fn fetch_month(
        &self,
        location: &Location,
        year: i32,
        month: u32,
        bypass_cache: bool,
    ) -> Result<MonthCalendar, PrayerError> {
        let location = location.normalized()?;
        require_month(month)?;
        require_year(year)?;

        self.fetch_validated(&location, year, month, bypass_cache)
            .await
    }

    /// The month after `(year, month)`, for a week that runs past month end.
    /// Only the current month's year is range checked, so a window starting
    /// in the last week of the final supported year can still be completed.
    pub async fn fetch_following_month(
        &self,
        location: &Location,
        year: i32,
        month: u32,
        bypass_cache: bool,
    ) -> Result<MonthCalendar, PrayerError> {
        let location = location.normalized()?;
        require_month(month)?;
        require_year(year)?;

        let (next_year, next_month) = next_month(year, month);
        self.fetch_validated(&location, next_year, next_month, bypass_cache)
            .await
    }

    async fn fetch_validated(
        &self,
        location: &Location,
        year: i32,
        month: u32,
        bypass_cache: bool,
    ) -> Result<MonthCalendar, PrayerError> {
        let key = calendar_cache_key(location, year, month);
        let expected_len = days_in_month(year, month) as usize;

        if !bypass_cache {
            match self.cache.get::<MonthCalendar>(&key).await {
                Some(days) if days.len() == expected_len => {
                    tracing::debug!(%key, "Calendar cache hit");
                    return Ok(days);
                }
                Some(days) => {
                    tracing::warn!(%key, len = days.len(), "Cached calendar has wrong length, refetching");
                }
                None => tracing::debug!(%key, "Calendar cache miss"),
            }
        }

        let days = self.provider.monthly_calendar(location, year, month).await?;
        if days.len() != expected_len {
            return Err(UpstreamError::InvalidPayload(format!(
                "expected {} days for {}-{:02}, got {}",
                expected_len,
                year,
                month,
                days.len()
            ))
            .into());
        }

        tracing::info!(%key, bypass_cache, "Fetched monthly calendar");
        self.cache.set(&key, &days, self.ttl).await;

        Ok(days)
    }
}
