use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    cache::Clock,
    config::Config,
    error::{ApiError, ApiResult},
    geocode::{CitySuggestion, GeocodeClient, GeocodeError, ReverseLocation, MIN_QUERY_CHARS},
    location::LocationStore,
    prayer::{
        aladhan::AladhanClient,
        calendar::MonthFetcher,
        overview::{select_day, DaySelection},
        ramadan::{ramadan_countdown, RamadanCountdown},
        types::{DayEntry, Location, QiblaDirection, WeekWindow},
        week::{get_day, get_week},
    },
    validation::{format_dd_mm_yyyy, parse_dd_mm_yyyy, parse_timezone, ValidationError},
};

const GEOCODE_CACHE_CONTROL: &str = "s-maxage=3600, stale-while-revalidate=86400";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<MonthFetcher>,
    pub aladhan: Arc<AladhanClient>,
    pub geocoder: Arc<GeocodeClient>,
    pub locations: LocationStore,
    pub clock: Arc<dyn Clock>,
    pub timezone: Tz,
}

// Request/Response types
/// Location is `city`+`country` or `lat`+`lon`; neither means the saved
/// location. `tz` overrides the viewer's timezone.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz: Option<String>,
    /// `DD-MM-YYYY`
    pub date: Option<String>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub location: Location,
    pub timezone: String,
    pub now: String,
    pub today: DaySelection,
    pub entry: DayEntry,
}

#[derive(Debug, Serialize)]
pub struct WeekResponse {
    pub location: Location,
    pub start_date: String,
    pub days: WeekWindow,
}

#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub location: Location,
    pub day: DaySelection,
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CitySuggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: Location,
    pub saved: bool,
}

impl AppState {
    fn now(&self, tz: Tz) -> DateTime<Tz> {
        DateTime::from_timestamp_millis(self.clock.now_millis())
            .unwrap_or_else(Utc::now)
            .with_timezone(&tz)
    }

    fn viewer_timezone(&self, tz: Option<&str>) -> Result<Tz, ValidationError> {
        match tz.map(str::trim).filter(|t| !t.is_empty()) {
            Some(tz) => parse_timezone(tz),
            None => Ok(self.timezone),
        }
    }

    fn default_location(&self) -> Result<Location, ValidationError> {
        Location::city(&self.config.default_city, &self.config.default_country)
    }

    async fn resolve_location(&self, params: &DashboardQuery) -> ApiResult<Location> {
        match (params.lat, params.lon) {
            (Some(lat), Some(lon)) => return Ok(Location::coordinates(lat, lon)?),
            (Some(_), None) => return Err(ValidationError::Required("lon").into()),
            (None, Some(_)) => return Err(ValidationError::Required("lat").into()),
            (None, None) => {}
        }

        if params.city.is_some() || params.country.is_some() {
            return Ok(Location::city(
                params.city.as_deref().unwrap_or_default(),
                params.country.as_deref().unwrap_or_default(),
            )?);
        }

        Ok(self.locations.resolve(self.default_location()?).await?)
    }

    fn reference_date(&self, params: &DashboardQuery, now: &DateTime<Tz>) -> ApiResult<NaiveDate> {
        match params.date.as_deref() {
            Some(raw) => Ok(parse_dd_mm_yyyy(raw, "date")?),
            None => Ok(now.date_naive()),
        }
    }
}

fn require_coordinates(lat: Option<f64>, lon: Option<f64>) -> Result<(f64, f64), ValidationError> {
    Ok((
        lat.ok_or(ValidationError::Required("lat"))?,
        lon.ok_or(ValidationError::Required("lon"))?,
    ))
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_today(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> ApiResult<Json<TodayResponse>> {
    let tz = state.viewer_timezone(params.tz.as_deref())?;
    let now = state.now(tz);
    let location = state.resolve_location(&params).await?;

    let entry = get_day(
        &state.fetcher,
        &location,
        now.date_naive(),
        params.refresh.unwrap_or(false),
    )
    .await?;

    Ok(Json(TodayResponse {
        today: select_day(&entry, &now),
        location,
        timezone: tz.name().to_string(),
        now: now.to_rfc3339(),
        entry,
    }))
}

pub async fn get_week_window(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> ApiResult<Json<WeekResponse>> {
    let tz = state.viewer_timezone(params.tz.as_deref())?;
    let now = state.now(tz);
    let location = state.resolve_location(&params).await?;
    let reference = state.reference_date(&params, &now)?;

    let days = get_week(
        &state.fetcher,
        &location,
        reference,
        params.refresh.unwrap_or(false),
    )
    .await?;

    Ok(Json(WeekResponse {
        location,
        start_date: format_dd_mm_yyyy(reference),
        days,
    }))
}

pub async fn get_selected_day(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> ApiResult<Json<DayResponse>> {
    let tz = state.viewer_timezone(params.tz.as_deref())?;
    let now = state.now(tz);
    let location = state.resolve_location(&params).await?;
    let date = state.reference_date(&params, &now)?;

    let entry = get_day(&state.fetcher, &location, date, params.refresh.unwrap_or(false)).await?;

    Ok(Json(DayResponse {
        day: select_day(&entry, &now),
        location,
    }))
}

pub async fn get_qibla(
    State(state): State<AppState>,
    Query(params): Query<CoordinatesQuery>,
) -> ApiResult<Json<QiblaDirection>> {
    let (lat, lon) = require_coordinates(params.lat, params.lon)?;
    let qibla = state.aladhan.qibla_direction(lat, lon).await?;
    Ok(Json(qibla))
}

pub async fn get_ramadan(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> ApiResult<Json<RamadanCountdown>> {
    let tz = state.viewer_timezone(params.tz.as_deref())?;
    let now = state.now(tz);
    let reference = state.reference_date(&params, &now)?;

    let countdown = ramadan_countdown(&state.aladhan, reference).await?;
    Ok(Json(countdown))
}

pub async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeocodeQuery>,
) -> Response {
    let query = params.q.unwrap_or_default();

    match state
        .geocoder
        .search(&query, params.limit, params.lang.as_deref())
        .await
    {
        Ok(results) => {
            let body = Json(GeocodeResponse {
                ok: true,
                results: Some(results),
                error: None,
            });
            if query.trim().chars().count() < MIN_QUERY_CHARS {
                return body.into_response();
            }
            ([(header::CACHE_CONTROL, GEOCODE_CACHE_CONTROL)], body).into_response()
        }
        Err(e) => {
            let status = match &e {
                GeocodeError::MissingUsername => StatusCode::INTERNAL_SERVER_ERROR,
                GeocodeError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            tracing::error!(error = %e, "City search failed");
            let body = Json(GeocodeResponse {
                ok: false,
                results: None,
                error: Some(e.to_string()),
            });
            (status, body).into_response()
        }
    }
}

pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<CoordinatesQuery>,
) -> ApiResult<Json<ReverseLocation>> {
    let (lat, lon) = require_coordinates(params.lat, params.lon)?;
    let place = state
        .geocoder
        .reverse(lat, lon, params.lang.as_deref())
        .await?;
    Ok(Json(place))
}

pub async fn get_location(State(state): State<AppState>) -> ApiResult<Json<LocationResponse>> {
    let response = match state.locations.load().await? {
        Some(location) => LocationResponse {
            location,
            saved: true,
        },
        None => LocationResponse {
            location: state.default_location()?,
            saved: false,
        },
    };
    Ok(Json(response))
}

pub async fn put_location(
    State(state): State<AppState>,
    Json(location): Json<Location>,
) -> Result<Json<LocationResponse>, ApiError> {
    let location = state.locations.save(&location).await?;
    Ok(Json(LocationResponse {
        location,
        saved: true,
    }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/today", get(get_today))
        .route("/api/week", get(get_week_window))
        .route("/api/day", get(get_selected_day))
        .route("/api/qibla", get(get_qibla))
        .route("/api/ramadan", get(get_ramadan))
        .route("/api/geocode", get(geocode))
        .route("/api/reverse-geocode", get(reverse_geocode))
        .route("/api/location", get(get_location).put(put_location))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{test_support::ManualClock, TtlCache};
    use crate::prayer::mock::MockCalendarProvider;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    // 2026-02-09T11:00:00Z, early afternoon in Damascus
    const NOW_MILLIS: i64 = 1_770_634_800_000;

    fn test_state(provider: Arc<MockCalendarProvider>) -> AppState {
        let config = Config::default();
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW_MILLIS));
        let cache = TtlCache::new(store.clone(), clock.clone());

        AppState {
            fetcher: Arc::new(MonthFetcher::new(provider, cache, config.calendar_cache_ttl)),
            aladhan: Arc::new(AladhanClient::new(&config).unwrap()),
            geocoder: Arc::new(GeocodeClient::new(&config).unwrap()),
            locations: LocationStore::new(store),
            clock,
            timezone: chrono_tz::Asia::Damascus,
            config: Arc::new(config),
        }
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        };
        app.oneshot(request.unwrap()).await.unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));
        let response = send(app, Method::GET, "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_week_uses_default_city_and_crosses_month() {
        let provider = Arc::new(MockCalendarProvider::new());
        let app = create_router(test_state(provider.clone()));

        let response = send(app, Method::GET, "/api/week?date=27-02-2026", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["location"]["city"], "Homs");
        assert_eq!(json["start_date"], "27-02-2026");
        let days = json["days"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[6]["date"]["gregorian"]["date"], "05-03-2026");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_week_refresh_bypasses_cache() {
        let provider = Arc::new(MockCalendarProvider::new());
        let app = create_router(test_state(provider.clone()));

        let uri = "/api/week?lat=34.7268&lon=36.7234&date=09-02-2026";
        send(app.clone(), Method::GET, uri, None).await;
        send(app.clone(), Method::GET, uri, None).await;
        assert_eq!(provider.call_count(), 1);

        let refreshed = format!("{uri}&refresh=true");
        let response = send(app, Method::GET, &refreshed, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_week_rejects_bad_input() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));

        let response = send(app.clone(), Method::GET, "/api/week?date=2026-02-09", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

        let response = send(app.clone(), Method::GET, "/api/week?lat=34.7", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(app, Method::GET, "/api/week?city=Homs", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let provider = Arc::new(MockCalendarProvider::with_fixed_len(3));
        let app = create_router(test_state(provider));

        let response = send(app, Method::GET, "/api/week?date=09-02-2026", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["code"], "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn test_today_marks_today_and_next_prayer() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));

        let response = send(app, Method::GET, "/api/today", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["timezone"], "Asia/Damascus");
        assert_eq!(json["today"]["date"], "09-02-2026");
        assert_eq!(json["today"]["is_today"], true);
        // past the mock Dhuhr (12:05), before Asr (15:20)
        assert_eq!(json["today"]["next_prayer"]["key"], "Asr");
        assert_eq!(json["today"]["prayers"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_selected_day_is_not_today() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));

        let response = send(app, Method::GET, "/api/day?date=11-02-2026", None).await;
        let json = body_json(response).await;
        assert_eq!(json["day"]["date"], "11-02-2026");
        assert_eq!(json["day"]["is_today"], false);
    }

    #[tokio::test]
    async fn test_unknown_timezone_is_rejected() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));
        let response = send(app, Method::GET, "/api/today?tz=Mars/Olympus", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_location_put_then_get_drives_default() {
        let provider = Arc::new(MockCalendarProvider::new());
        let app = create_router(test_state(provider.clone()));

        let response = send(app.clone(), Method::GET, "/api/location", None).await;
        let json = body_json(response).await;
        assert_eq!(json["saved"], false);
        assert_eq!(json["location"]["city"], "Homs");

        let body = r#"{"type":"coords","latitude":33.5138,"longitude":36.2765}"#;
        let response = send(app.clone(), Method::PUT, "/api/location", Some(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(send(app.clone(), Method::GET, "/api/location", None).await).await;
        assert_eq!(json["saved"], true);
        assert_eq!(json["location"]["type"], "coords");

        send(app, Method::GET, "/api/week?date=01-02-2026", None).await;
        assert_eq!(
            provider.calls()[0].0,
            Location::coordinates(33.5138, 36.2765).unwrap()
        );
    }

    #[tokio::test]
    async fn test_padded_saved_city_shares_cache_with_query_city() {
        let provider = Arc::new(MockCalendarProvider::new());
        let app = create_router(test_state(provider.clone()));

        let body = r#"{"type":"city","city":" Hama ","country":"Syria "}"#;
        let response = send(app.clone(), Method::PUT, "/api/location", Some(body)).await;
        let json = body_json(response).await;
        assert_eq!(json["location"]["city"], "Hama");
        assert_eq!(json["location"]["country"], "Syria");

        let saved = send(app.clone(), Method::GET, "/api/week?date=09-02-2026", None).await;
        assert_eq!(saved.status(), StatusCode::OK);
        let explicit = send(
            app,
            Method::GET,
            "/api/week?city=Hama&country=Syria&date=09-02-2026",
            None,
        )
        .await;
        assert_eq!(explicit.status(), StatusCode::OK);

        assert_eq!(
            provider.calls(),
            vec![(Location::city("Hama", "Syria").unwrap(), 2026, 2)]
        );
    }

    #[tokio::test]
    async fn test_location_put_rejects_invalid() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));
        let body = r#"{"type":"city","city":" ","country":"Syria"}"#;

        let response = send(app, Method::PUT, "/api/location", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_geocode_short_query_is_empty_ok() {
        // no username configured and no network: short queries never get that far
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));
        let response = send(app, Method::GET, "/api/geocode?q=ho", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        let json = body_json(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_geocode_without_username_is_server_error() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));
        let response = send(app, Method::GET, "/api/geocode?q=Homs", None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("GEONAMES_USERNAME"));
    }

    #[tokio::test]
    async fn test_qibla_requires_coordinates() {
        let app = create_router(test_state(Arc::new(MockCalendarProvider::new())));
        let response = send(app, Method::GET, "/api/qibla?lat=34.7", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
