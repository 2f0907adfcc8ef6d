use super::types::*;
use super::{CalendarProvider, PrayerError};
use crate::config::Config;
use crate::validation::{
    format_dd_mm_yyyy, parse_dd_mm_yyyy, require_date_format, require_latitude, require_longitude,
    require_month, require_value, require_year,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Unexpected payload: {0}")]
    InvalidPayload(String),
}

pub struct AladhanClient {
    client: Client,
    base_url: String,
    method: u8,
}

impl AladhanClient {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent("PrayerDashboard/1.0")
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.aladhan_base_url.trim_end_matches('/').to_string(),
            method: config.aladhan_method,
        })
    }

    pub async fn monthly_calendar_by_city(
        &self,
        city: &str,
        country: &str,
        month: u32,
        year: i32,
    ) -> Result<MonthCalendar, PrayerError> {
        let city = require_value(city, "city")?;
        let country = require_value(country, "country")?;
        require_month(month)?;
        require_year(year)?;

        let data = self
            .get_data(
                "/calendarByCity",
                &[
                    ("city", city),
                    ("country", country),
                    ("month", month.to_string()),
                    ("year", year.to_string()),
                ],
            )
            .await?;

        Ok(parse_calendar(data)?)
    }

    pub async fn monthly_calendar_by_coords(
        &self,
        lat: f64,
        lon: f64,
        month: u32,
        year: i32,
    ) -> Result<MonthCalendar, PrayerError> {
        require_latitude(lat)?;
        require_longitude(lon)?;
        require_month(month)?;
        require_year(year)?;

        let data = self
            .get_data(
                "/calendar",
                &[
                    ("latitude", lat.to_string()),
                    ("longitude", lon.to_string()),
                    ("month", month.to_string()),
                    ("year", year.to_string()),
                ],
            )
            .await?;

        Ok(parse_calendar(data)?)
    }

    pub async fn qibla_direction(&self, lat: f64, lon: f64) -> Result<QiblaDirection, PrayerError> {
        require_latitude(lat)?;
        require_longitude(lon)?;

        let data = self.get_data(&format!("/qibla/{lat}/{lon}"), &[]).await?;
        let qibla: QiblaDirection = decode(data)?;

        if !qibla.direction.is_finite() {
            return Err(UpstreamError::InvalidPayload(
                "qibla direction is not a finite number".to_string(),
            )
            .into());
        }
        Ok(qibla)
    }

    pub async fn gregorian_to_hijri(&self, date: NaiveDate) -> Result<HijriDate, PrayerError> {
        let data = self
            .get_data("/gToH", &[("date", format_dd_mm_yyyy(date))])
            .await?;
        let conversion: HijriConversion = decode(data)?;
        Ok(conversion.hijri)
    }

    /// `hijri_date` is `DD-MM-YYYY` in the Hijri calendar.
    pub async fn hijri_to_gregorian(&self, hijri_date: &str) -> Result<NaiveDate, PrayerError> {
        require_date_format(hijri_date, "Hijri date")?;

        let data = self
            .get_data("/hToG", &[("date", hijri_date.to_string())])
            .await?;
        let conversion: GregorianConversion = decode(data)?;

        parse_dd_mm_yyyy(&conversion.gregorian.date, "Gregorian date").map_err(|e| {
            UpstreamError::InvalidPayload(format!("provider returned an invalid date: {e}")).into()
        })
    }

    async fn get_data(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::info!(%url, "Requesting Aladhan API");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("method", self.method)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let envelope: Envelope<Value> = response.json().await?;
        if envelope.code != 200 {
            return Err(UpstreamError::ApiError(format!(
                "provider code {}: {}",
                envelope.code, envelope.status
            )));
        }

        Ok(envelope.data)
    }
}

#[async_trait]
impl CalendarProvider for AladhanClient {
    async fn monthly_calendar(
        &self,
        location: &Location,
        year: i32,
        month: u32,
    ) -> Result<MonthCalendar, PrayerError> {
        match location {
            Location::ByCity { city, country } => {
                self.monthly_calendar_by_city(city, country, month, year).await
            }
            Location::ByCoordinates {
                latitude,
                longitude,
            } => {
                self.monthly_calendar_by_coords(*latitude, *longitude, month, year)
                    .await
            }
        }
    }
}

fn parse_calendar(data: Value) -> Result<MonthCalendar, UpstreamError> {
    if !data.is_array() {
        return Err(UpstreamError::InvalidPayload(
            "calendar data is not an array".to_string(),
        ));
    }
    decode(data)
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, UpstreamError> {
    Ok(serde_json::from_value(data)?)
}
