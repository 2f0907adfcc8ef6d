use super::types::{DayEntry, Prayer, Timings};
use crate::validation::format_dd_mm_yyyy;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static LEADING_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{1,2})").expect("static time pattern"));

/// Strips the provider's trailing annotation (`"05:12 (+03)"` -> `"05:12"`)
/// and zero-pads the hour. The minute is kept as written, so `"5:3"`
/// becomes `"05:3"`. Strings without a leading time are returned trimmed.
pub fn normalize_time(raw: &str) -> String {
    let trimmed = raw.trim();
    match LEADING_TIME.captures(trimmed) {
        Some(caps) => format!("{:0>2}:{}", &caps[1], &caps[2]),
        None => trimmed.to_string(),
    }
}

fn parse_clock(time: &str) -> Option<NaiveTime> {
    let caps = LEADING_TIME.captures(time)?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrayerSlot {
    pub key: Prayer,
    pub label: &'static str,
    /// Normalized `HH:MM`
    pub time: String,
}

/// Prayers in canonical order with normalized times.
pub fn build_prayers(timings: &Timings) -> Vec<PrayerSlot> {
    Prayer::ALL
        .iter()
        .map(|&key| PrayerSlot {
            key,
            label: key.label_ar(),
            time: normalize_time(timings.get(key)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextPrayer {
    #[serde(flatten)]
    pub prayer: PrayerSlot,
    pub remaining_ms: i64,
    pub is_tomorrow: bool,
}

/// Ambiguous wall-clock times take the earlier instant. Times inside a
/// spring-forward gap do not exist and are read one hour later.
fn at_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    let local = date.and_time(time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
}

/// First prayer strictly after `now`, reading each time as a wall-clock time
/// on `now`'s local date. Past Isha, this is tomorrow's Fajr at the same
/// wall-clock time. Slots whose time does not parse are skipped.
pub fn next_prayer<Tz: TimeZone>(prayers: &[PrayerSlot], now: &DateTime<Tz>) -> Option<NextPrayer> {
    let tz = now.timezone();
    let today = now.date_naive();

    let upcoming = prayers.iter().find_map(|slot| {
        let at = at_local(&tz, today, parse_clock(&slot.time)?)?;
        (at > *now).then(|| (slot, at))
    });

    let (slot, at, is_tomorrow) = match upcoming {
        Some((slot, at)) => (slot, at, false),
        None => {
            let fajr = prayers.first()?;
            let tomorrow = today.succ_opt()?;
            (fajr, at_local(&tz, tomorrow, parse_clock(&fajr.time)?)?, true)
        }
    };

    Some(NextPrayer {
        prayer: slot.clone(),
        remaining_ms: (at - now.clone()).num_milliseconds(),
        is_tomorrow,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrayerOverview {
    pub prayers: Vec<PrayerSlot>,
    pub next_prayer: Option<NextPrayer>,
}

pub fn build_overview<Tz: TimeZone>(timings: &Timings, now: &DateTime<Tz>) -> PrayerOverview {
    let prayers = build_prayers(timings);
    let next_prayer = next_prayer(&prayers, now);
    PrayerOverview {
        prayers,
        next_prayer,
    }
}

/// A single day picked from the week strip (or today).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySelection {
    pub date: String,
    pub weekday: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday_ar: Option<String>,
    pub is_today: bool,
    #[serde(flatten)]
    pub overview: PrayerOverview,
}

pub fn select_day<Tz: TimeZone>(entry: &DayEntry, now: &DateTime<Tz>) -> DaySelection {
    let today = format_dd_mm_yyyy(now.date_naive());
    let weekday = &entry.date.gregorian.weekday;

    DaySelection {
        date: entry.gregorian_date().to_string(),
        weekday: weekday.en.clone(),
        weekday_ar: weekday.ar.clone(),
        is_today: entry.gregorian_date() == today,
        overview: build_overview(&entry.timings, now),
    }
}
