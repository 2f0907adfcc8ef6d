use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static DD_MM_YYYY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{4})$").expect("static date pattern"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("latitude must be between -90 and 90, got {0}")]
    Latitude(f64),
    #[error("longitude must be between -180 and 180, got {0}")]
    Longitude(f64),
    #[error("month must be an integer between 1 and 12, got {0}")]
    Month(u32),
    #[error("year must be between 1900 and 3000, got {0}")]
    Year(i32),
    #[error("{field} {reason}")]
    Date { field: &'static str, reason: String },
    #[error("unknown timezone: {0}")]
    Timezone(String),
}

/// Trims `value` and rejects it when nothing is left.
pub fn require_value(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

pub fn require_latitude(lat: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::Latitude(lat));
    }
    Ok(())
}

pub fn require_longitude(lon: f64) -> Result<(), ValidationError> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::Longitude(lon));
    }
    Ok(())
}

pub fn require_month(month: u32) -> Result<(), ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::Month(month));
    }
    Ok(())
}

pub fn require_year(year: i32) -> Result<(), ValidationError> {
    if !(1900..=3000).contains(&year) {
        return Err(ValidationError::Year(year));
    }
    Ok(())
}

/// Parses a `DD-MM-YYYY` string into a calendar date.
pub fn parse_dd_mm_yyyy(raw: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
    let invalid = |reason: &str| ValidationError::Date {
        field,
        reason: reason.to_string(),
    };

    let caps = DD_MM_YYYY
        .captures(raw.trim())
        .ok_or_else(|| invalid("must be in DD-MM-YYYY format"))?;

    let day: u32 = caps[1].parse().map_err(|_| invalid("day is not a number"))?;
    let month: u32 = caps[2].parse().map_err(|_| invalid("month is not a number"))?;
    let year: i32 = caps[3].parse().map_err(|_| invalid("year is not a number"))?;

    if !(1..=31).contains(&day) {
        return Err(invalid("day must be between 01 and 31"));
    }
    if !(1..=12).contains(&month) {
        return Err(invalid("month must be between 01 and 12"));
    }
    if !(1900..=3000).contains(&year) {
        return Err(invalid("year must be a reasonable value"));
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("does not exist in the calendar"))
}

/// Shape check for `DD-MM-YYYY` strings that are not Gregorian (Hijri dates).
pub fn require_date_format(raw: &str, field: &'static str) -> Result<(), ValidationError> {
    let caps = DD_MM_YYYY.captures(raw.trim()).ok_or(ValidationError::Date {
        field,
        reason: "must be in DD-MM-YYYY format".to_string(),
    })?;

    let in_range = |idx: usize, max: u32| {
        caps[idx]
            .parse::<u32>()
            .map(|v| (1..=max).contains(&v))
            .unwrap_or(false)
    };
    if !in_range(1, 31) || !in_range(2, 12) {
        return Err(ValidationError::Date {
            field,
            reason: "day or month out of range".to_string(),
        });
    }
    Ok(())
}

pub fn format_dd_mm_yyyy(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

pub fn parse_timezone(tz_str: &str) -> Result<chrono_tz::Tz, ValidationError> {
    tz_str
        .parse::<chrono_tz::Tz>()
        .map_err(|_| ValidationError::Timezone(tz_str.to_string()))
}
