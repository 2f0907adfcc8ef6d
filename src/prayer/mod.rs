pub mod aladhan;
pub mod calendar;
#[cfg(test)]
pub mod mock;
pub mod overview;
pub mod ramadan;
pub mod types;
pub mod week;

use crate::validation::ValidationError;
use aladhan::UpstreamError;
use async_trait::async_trait;
use thiserror::Error;
use types::{Location, MonthCalendar};

#[derive(Error, Debug)]
pub enum PrayerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Source of monthly prayer calendars (the upstream provider).
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn monthly_calendar(
        &self,
        location: &Location,
        year: i32,
        month: u32,
    ) -> Result<MonthCalendar, PrayerError>;
}
