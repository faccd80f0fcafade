//! Get-or-load helper over a [`CacheStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheKey, CacheStore};
use crate::{Result, telemetry};

/// Read-through cache: serve from the store, fall back to a loader on a
/// miss and populate the store with its result.
///
/// Store failures never fail the read. A failed or undecodable `GET` is
/// treated as a miss, and a failed `SET` is logged and dropped. Loader
/// errors propagate and leave the store untouched.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the cached value for `key`, or load, store and return it.
    ///
    /// The loader runs at most once per call, and only on a miss.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        loader: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.lookup(key).await {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
            return Ok(value);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);

        let value = loader().await?;

        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(key.as_str(), bytes, ttl).await {
                    metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "set")
                        .increment(1);
                    tracing::warn!(key = %key, error = %e, "cache set failed");
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache value not serializable");
            }
        }

        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let bytes = match self.store.get(key.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "get").increment(1);
                tracing::warn!(key = %key, error = %e, "cache get failed, loading from source");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }
}
