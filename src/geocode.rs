use crate::config::Config;
use crate::validation::{require_latitude, require_longitude, ValidationError};
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const MIN_QUERY_CHARS: usize = 3;
pub const DEFAULT_LIMIT: u32 = 8;
pub const MAX_LIMIT: u32 = 12;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Missing GEONAMES_USERNAME environment variable")]
    MissingUsername,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Geocoding request failed: {0}")]
    ApiError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub label: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseLocation {
    pub city: String,
    pub country: String,
}

pub type SuggestionCache = Cache<String, Vec<CitySuggestion>>;

pub fn init_cache() -> SuggestionCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(60 * 60)) // 1 hour
        .build()
}

/// Missing or zero means the default; anything else is capped.
pub fn effective_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_LIMIT,
        Some(n) => n.min(MAX_LIMIT),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    geonames: Vec<GeoName>,
    /// GeoNames reports errors (bad username, quota) with HTTP 200.
    status: Option<SearchStatus>,
}

#[derive(Debug, Deserialize)]
struct SearchStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoName {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country_name: String,
    lat: Option<Value>,
    lng: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseResponse {
    #[serde(default)]
    city: String,
    #[serde(default)]
    locality: String,
    #[serde(default)]
    principal_subdivision: String,
    #[serde(default)]
    country_name: String,
}

/// GeoNames sends coordinates as strings; accept numbers too.
fn coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn to_suggestion(item: GeoName) -> Option<CitySuggestion> {
    let lat = coordinate(item.lat.as_ref())?;
    let lon = coordinate(item.lng.as_ref())?;
    if item.name.is_empty() || item.country_name.is_empty() {
        return None;
    }

    Some(CitySuggestion {
        label: format!("{}, {}", item.name, item.country_name),
        city: item.name,
        country: item.country_name,
        lat,
        lon,
    })
}

fn first_non_empty(candidates: [String; 3]) -> String {
    candidates
        .into_iter()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

pub struct GeocodeClient {
    client: Client,
    geonames_base_url: String,
    geonames_username: Option<String>,
    bigdatacloud_base_url: String,
    cache: SuggestionCache,
}

impl GeocodeClient {
    pub fn new(config: &Config) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent("PrayerDashboard/1.0")
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            geonames_base_url: config.geonames_base_url.trim_end_matches('/').to_string(),
            geonames_username: config
                .geonames_username
                .clone()
                .filter(|u| !u.trim().is_empty()),
            bigdatacloud_base_url: config
                .bigdatacloud_base_url
                .trim_end_matches('/')
                .to_string(),
            cache: init_cache(),
        })
    }

    /// City suggestions for a prefix. Short queries answer empty without
    /// touching the provider.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
        lang: Option<&str>,
    ) -> Result<Vec<CitySuggestion>, GeocodeError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let username = self
            .geonames_username
            .as_deref()
            .ok_or(GeocodeError::MissingUsername)?;
        let limit = effective_limit(limit);
        let lang = lang.map(str::trim).filter(|l| !l.is_empty()).unwrap_or("en");

        let cache_key = format!("{}|{}|{}", lang, limit, query);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!(%cache_key, "Suggestion cache hit");
            return Ok(cached);
        }

        let url = format!("{}/searchJSON", self.geonames_base_url);
        let max_rows = limit.to_string();
        tracing::info!(%url, query, "Requesting GeoNames search");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("name_startsWith", query),
                ("featureClass", "P"),
                ("maxRows", max_rows.as_str()),
                ("style", "FULL"),
                ("lang", lang),
                ("username", username),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ApiError(format!(
                "GeoNames request failed: {}",
                status.as_u16()
            )));
        }

        let body: SearchResponse = response.json().await?;
        if let Some(status) = body.status {
            return Err(GeocodeError::ApiError(format!(
                "GeoNames error: {}",
                status.message
            )));
        }

        let results: Vec<CitySuggestion> =
            body.geonames.into_iter().filter_map(to_suggestion).collect();

        self.cache.insert(cache_key, results.clone()).await;
        Ok(results)
    }

    /// City and country for a coordinate pair. The city falls back to the
    /// locality, then to the principal subdivision.
    pub async fn reverse(
        &self,
        lat: f64,
        lon: f64,
        lang: Option<&str>,
    ) -> Result<ReverseLocation, GeocodeError> {
        require_latitude(lat)?;
        require_longitude(lon)?;
        let lang = lang.map(str::trim).filter(|l| !l.is_empty()).unwrap_or("en");

        let url = format!("{}/reverse-geocode-client", self.bigdatacloud_base_url);
        tracing::info!(%url, lat, lon, "Requesting reverse geocode");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("localityLanguage", lang.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ApiError(format!(
                "reverse geocode failed: {}",
                status.as_u16()
            )));
        }

        let body: ReverseResponse = response.json().await?;
        Ok(ReverseLocation {
            city: first_non_empty([body.city, body.locality, body.principal_subdivision]),
            country: body.country_name.trim().to_string(),
        })
    }
}
