//! Expiring key/value cache layered over a [`KeyValueStore`].
//!
//! Entries are stored as JSON `{ "value": ..., "expiry": <unix millis> }`.
//! Expired or malformed entries are removed when they are read; there is no
//! background sweeper and no size bound.

use crate::store::KeyValueStore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    value: T,
    expiry: i64,
}

/// Reasons a stored entry is not served. Never leaves this module.
#[derive(Error, Debug)]
enum CacheReadError {
    #[error("malformed cache entry: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("cache entry expired at {0}")]
    Expired(i64),
}

#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stores `value` until `now + ttl`, overwriting any previous entry.
    ///
    /// Persistence is best-effort: failures are logged and swallowed.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            value,
            expiry: self.clock.now_millis().saturating_add(ttl_ms),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set_item(key, &raw).await {
            tracing::warn!(key, error = %e, "Failed to persist cache entry");
        }
    }

    /// Returns the live value for `key`, evicting it if it is expired or unreadable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache store read failed, treating as miss");
                return None;
            }
        };

        match self.decode(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, reason = %e, "Evicting cache entry");
                if let Err(e) = self.store.remove_item(key).await {
                    tracing::warn!(key, error = %e, "Failed to evict cache entry");
                }
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T, CacheReadError> {
        let entry: CacheEntry<T> = serde_json::from_str(raw)?;
        if self.clock.now_millis() > entry.expiry {
            return Err(CacheReadError::Expired(entry.expiry));
        }
        Ok(entry.value)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ManualClock;
    use super::*;
    use crate::store::MemoryStore;

    fn cache_with_clock() -> (TtlCache, MemoryStore, Arc<ManualClock>) {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = TtlCache::new(Arc::new(store.clone()), clock.clone());
        (cache, store, clock)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _, _) = cache_with_clock();
        cache.set("k", &vec![1, 2, 3], Duration::from_secs(60)).await;

        let value: Option<Vec<i32>> = cache.get("k").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let (cache, _, _) = cache_with_clock();
        let value: Option<String> = cache.get("nope").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (cache, _, _) = cache_with_clock();
        cache.set("k", &"old", Duration::from_secs(60)).await;
        cache.set("k", &"new", Duration::from_secs(60)).await;

        let value: Option<String> = cache.get("k").await;
        assert_eq!(value.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_entry_expires_and_is_evicted() {
        let (cache, store, clock) = cache_with_clock();
        cache.set("k", &"v", Duration::from_millis(1)).await;

        clock.advance(2);

        let value: Option<String> = cache.get("k").await;
        assert!(value.is_none());
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_alive_at_exact_expiry() {
        let (cache, _, clock) = cache_with_clock();
        cache.set("k", &"v", Duration::from_millis(5)).await;

        clock.advance(5);

        let value: Option<String> = cache.get("k").await;
        assert_eq!(value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_malformed_entry_is_evicted() {
        let (cache, store, _) = cache_with_clock();
        store.set_item("k", "{not json").await.unwrap();

        let value: Option<String> = cache.get("k").await;
        assert!(value.is_none());
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_of_wrong_shape_is_evicted() {
        let (cache, store, _) = cache_with_clock();
        store
            .set_item("k", r#"{"value":"text","expiry":9999999999999}"#)
            .await
            .unwrap();

        let value: Option<Vec<i32>> = cache.get("k").await;
        assert!(value.is_none());
        assert_eq!(store.len().await, 0);
    }
}
