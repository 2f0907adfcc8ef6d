use crate::prayer::types::Location;
use crate::store::{KeyValueStore, StoreError};
use crate::validation::ValidationError;
use std::sync::Arc;
use thiserror::Error;

pub const LOCATION_KEY: &str = "ms_location";

#[derive(Error, Debug)]
pub enum LocationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The viewer's active location, persisted as tagged JSON.
#[derive(Clone)]
pub struct LocationStore {
    store: Arc<dyn KeyValueStore>,
}

impl LocationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved location, if one is stored and still valid. Unreadable values
    /// are treated as absent.
    pub async fn load(&self) -> Result<Option<Location>, StoreError> {
        let Some(raw) = self.store.get_item(LOCATION_KEY).await? else {
            return Ok(None);
        };

        let location = match serde_json::from_str::<Location>(&raw) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed saved location");
                return Ok(None);
            }
        };

        match location.normalized() {
            Ok(location) => Ok(Some(location)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid saved location");
                Ok(None)
            }
        }
    }

    /// Validates, trims and persists `location`, returning what was stored.
    pub async fn save(&self, location: &Location) -> Result<Location, LocationError> {
        let location = location.normalized()?;
        let raw = serde_json::to_string(&location).map_err(StoreError::from)?;
        self.store.set_item(LOCATION_KEY, &raw).await?;
        tracing::info!(?location, "Saved location");
        Ok(location)
    }

    /// Saved location or `fallback` when nothing usable is stored.
    pub async fn resolve(&self, fallback: Location) -> Result<Location, StoreError> {
        Ok(self.load().await?.unwrap_or(fallback))
    }
}
