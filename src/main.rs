use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod error;
mod geocode;
mod location;
mod prayer;
mod routes;
mod store;
mod validation;

use cache::{SystemClock, TtlCache};
use config::Config;
use geocode::GeocodeClient;
use location::LocationStore;
use prayer::{aladhan::AladhanClient, calendar::MonthFetcher};
use routes::{create_router, AppState};
use store::{KeyValueStore, MemoryStore, SqliteStore};

async fn open_store(database_url: &str) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if database_url == "memory" {
        tracing::warn!("DATABASE_URL=memory, cached calendars and the saved location will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = sqlx::SqlitePool::connect(database_url).await?;
    let store = SqliteStore::new(pool);
    store.init_tables().await?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prayer_dashboard_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let timezone = validation::parse_timezone(&config.app_timezone)?;

    let store = open_store(&config.database_url).await?;
    let cache = TtlCache::new(store.clone(), Arc::new(SystemClock));

    let aladhan = Arc::new(AladhanClient::new(&config)?);
    let fetcher = Arc::new(MonthFetcher::new(
        aladhan.clone(),
        cache,
        config.calendar_cache_ttl,
    ));
    let geocoder = Arc::new(GeocodeClient::new(&config)?);
    if config.geonames_username.is_none() {
        tracing::warn!("GEONAMES_USERNAME is not set, city search will be unavailable");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        fetcher,
        aladhan,
        geocoder,
        locations: LocationStore::new(store),
        clock: Arc::new(SystemClock),
        timezone,
    };

    let app = create_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
