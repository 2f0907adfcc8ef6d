use super::aladhan::UpstreamError;
use super::calendar::MonthFetcher;
use super::types::{DayEntry, Location, WeekWindow, WEEK_LENGTH};
use super::PrayerError;
use chrono::{Datelike, NaiveDate};

/// Seven consecutive days of prayer times starting at `reference_date`.
///
/// Only when the current month has fewer than seven days left is the
/// following month fetched (same `bypass_cache` flag) and its first days
/// appended.
pub async fn get_week(
    fetcher: &MonthFetcher,
    location: &Location,
    reference_date: NaiveDate,
    bypass_cache: bool,
) -> Result<WeekWindow, PrayerError> {
    let (year, month) = (reference_date.year(), reference_date.month());
    let start_index = start_index_for(reference_date);

    let current = fetcher
        .fetch_month(location, year, month, bypass_cache)
        .await?;

    if fits_in_month(&current, start_index) {
        return Ok(slice_week(&current, &[], start_index));
    }

    tracing::debug!(%reference_date, "Week crosses month end, fetching following month");
    let next = fetcher
        .fetch_following_month(location, year, month, bypass_cache)
        .await?;

    Ok(slice_week(&current, &next, start_index))
}

/// The single day entry for `date`, taken from its month's calendar.
pub async fn get_day(
    fetcher: &MonthFetcher,
    location: &Location,
    date: NaiveDate,
    bypass_cache: bool,
) -> Result<DayEntry, PrayerError> {
    let calendar = fetcher
        .fetch_month(location, date.year(), date.month(), bypass_cache)
        .await?;

    calendar
        .get(start_index_for(date))
        .cloned()
        .ok_or_else(|| {
            UpstreamError::InvalidPayload(format!("calendar has no entry for {date}")).into()
        })
}

/// Zero-based index of the reference day inside its month's calendar.
pub fn start_index_for(reference_date: NaiveDate) -> usize {
    reference_date.day().saturating_sub(1) as usize
}

pub fn fits_in_month(current: &[DayEntry], start_index: usize) -> bool {
    current.len().saturating_sub(start_index) >= WEEK_LENGTH
}

/// `current[start..]` topped up from the head of `next`, capped at a week.
pub fn slice_week(current: &[DayEntry], next: &[DayEntry], start_index: usize) -> WeekWindow {
    let from_current = current.get(start_index..).unwrap_or_default();
    let remaining = WEEK_LENGTH.saturating_sub(from_current.len());

    from_current
        .iter()
        .chain(next.iter().take(remaining))
        .take(WEEK_LENGTH)
        .cloned()
        .collect()
}
