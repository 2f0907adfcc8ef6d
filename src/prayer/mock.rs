use super::calendar::days_in_month;
use super::types::*;
use super::{CalendarProvider, PrayerError};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Deterministic provider that records every month it is asked for.
pub struct MockCalendarProvider {
    calls: Mutex<Vec<(Location, i32, u32)>>,
    revision: AtomicU32,
    fixed_len: Option<usize>,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            revision: AtomicU32::new(0),
            fixed_len: None,
        }
    }

    /// Always answers with `len` days, regardless of the month.
    pub fn with_fixed_len(len: usize) -> Self {
        Self {
            fixed_len: Some(len),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<(Location, i32, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Changes the Isha minute of every subsequently generated day, so a
    /// refetch is observable.
    pub fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn monthly_calendar(
        &self,
        location: &Location,
        year: i32,
        month: u32,
    ) -> Result<MonthCalendar, PrayerError> {
        self.calls
            .lock()
            .unwrap()
            .push((location.clone(), year, month));

        let revision = self.revision.load(Ordering::SeqCst);
        let days = self
            .fixed_len
            .unwrap_or_else(|| days_in_month(year, month) as usize);
        let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();

        Ok((0..days)
            .map(|offset| generate_mock_day(first + Duration::days(offset as i64), revision))
            .collect())
    }
}

pub fn generate_mock_day(date: NaiveDate, revision: u32) -> DayEntry {
    // Fajr drifts by one minute per day of month so entries are distinguishable.
    let minute = date.day() % 60;

    DayEntry {
        timings: Timings {
            fajr: format!("04:{minute:02} (+03)"),
            sunrise: "06:10 (+03)".to_string(),
            dhuhr: "12:05 (+03)".to_string(),
            asr: "15:20 (+03)".to_string(),
            maghrib: "17:55 (+03)".to_string(),
            isha: format!("19:{:02} (+03)", (15 + revision) % 60),
        },
        date: DayDate {
            readable: Some(date.format("%d %b %Y").to_string()),
            gregorian: GregorianDate {
                date: date.format("%d-%m-%Y").to_string(),
                weekday: WeekdayLabel {
                    en: date.format("%A").to_string(),
                    ar: None,
                },
            },
            hijri: None,
        },
    }
}
