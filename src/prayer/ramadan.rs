use super::aladhan::{AladhanClient, UpstreamError};
use super::PrayerError;
use crate::validation::format_dd_mm_yyyy;
use chrono::NaiveDate;
use serde::Serialize;

const RAMADAN: u32 = 9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamadanCountdown {
    pub remaining_days: i64,
    /// `DD-MM-YYYY` (Hijri)
    pub today_hijri: String,
    /// `01-09-YYYY` (Hijri)
    pub ramadan_start_hijri: String,
    /// `DD-MM-YYYY`
    pub ramadan_start_gregorian: String,
}

/// Hijri year holding the next 1st of Ramadan. Once Ramadan has begun this
/// moves on to the following year.
pub fn next_ramadan_hijri_year(hijri_year: i32, hijri_month: u32) -> i32 {
    if hijri_month < RAMADAN {
        hijri_year
    } else {
        hijri_year + 1
    }
}

/// Whole days from `today` to `start`, never negative.
pub fn days_until(today: NaiveDate, start: NaiveDate) -> i64 {
    (start - today).num_days().max(0)
}

pub async fn ramadan_countdown(
    client: &AladhanClient,
    reference: NaiveDate,
) -> Result<RamadanCountdown, PrayerError> {
    let today_hijri = client.gregorian_to_hijri(reference).await?;

    let hijri_year: i32 = today_hijri.year.trim().parse().map_err(|_| {
        UpstreamError::InvalidPayload(format!(
            "Hijri conversion returned invalid year {:?}",
            today_hijri.year
        ))
    })?;
    let hijri_month = today_hijri.month.number;
    if !(1..=12).contains(&hijri_month) {
        return Err(UpstreamError::InvalidPayload(format!(
            "Hijri conversion returned invalid month {hijri_month}"
        ))
        .into());
    }

    let ramadan_start_hijri = format!(
        "01-{:02}-{}",
        RAMADAN,
        next_ramadan_hijri_year(hijri_year, hijri_month)
    );
    let start = client.hijri_to_gregorian(&ramadan_start_hijri).await?;

    tracing::debug!(%reference, %start, "Resolved next Ramadan");

    Ok(RamadanCountdown {
        remaining_days: days_until(reference, start),
        today_hijri: today_hijri.date,
        ramadan_start_hijri,
        ramadan_start_gregorian: format_dd_mm_yyyy(start),
    })
}
