use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub aladhan_base_url: String,
    pub aladhan_method: u8,
    pub geonames_base_url: String,
    pub geonames_username: Option<String>,
    pub bigdatacloud_base_url: String,
    pub app_timezone: String,
    pub default_city: String,
    pub default_country: String,
    pub calendar_cache_ttl: Duration,
    pub http_timeout: Duration,
    pub database_url: String,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aladhan_base_url: "https://api.aladhan.com/v1".to_string(),
            aladhan_method: 2,
            geonames_base_url: "https://secure.geonames.org".to_string(),
            geonames_username: None,
            bigdatacloud_base_url: "https://api.bigdatacloud.net/data".to_string(),
            app_timezone: "Asia/Damascus".to_string(),
            default_city: "Homs".to_string(),
            default_country: "Syria".to_string(),
            calendar_cache_ttl: Duration::from_secs(6 * 60 * 60), // 6 hours
            http_timeout: Duration::from_secs(10),
            database_url: "sqlite:./prayer_dashboard.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        Ok(Config {
            aladhan_base_url: env::var("ALADHAN_BASE_URL").unwrap_or(defaults.aladhan_base_url),
            aladhan_method: match env::var("ALADHAN_METHOD") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("ALADHAN_METHOD must be a small integer, got {raw}"))?,
                Err(_) => defaults.aladhan_method,
            },
            geonames_base_url: env::var("GEONAMES_BASE_URL").unwrap_or(defaults.geonames_base_url),
            geonames_username: env::var("GEONAMES_USERNAME")
                .ok()
                .filter(|name| !name.trim().is_empty()),
            bigdatacloud_base_url: env::var("BIGDATACLOUD_BASE_URL")
                .unwrap_or(defaults.bigdatacloud_base_url),
            app_timezone: env::var("APP_TIMEZONE").unwrap_or(defaults.app_timezone),
            default_city: env::var("DEFAULT_CITY").unwrap_or(defaults.default_city),
            default_country: env::var("DEFAULT_COUNTRY").unwrap_or(defaults.default_country),
            calendar_cache_ttl: secs_from_env("CALENDAR_CACHE_TTL_SECS")?
                .unwrap_or(defaults.calendar_cache_ttl),
            http_timeout: secs_from_env("HTTP_TIMEOUT_SECS")?.unwrap_or(defaults.http_timeout),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }
}

fn secs_from_env(name: &str) -> anyhow::Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => {
            let secs: u64 = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("{name} must be a number of seconds, got {raw}"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}
