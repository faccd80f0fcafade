//! Redis-backed cache store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::CacheStore;
use crate::Result;

/// [`CacheStore`] over a shared Redis instance.
///
/// The multiplexed connection is dialed once in [`connect`](Self::connect)
/// and cloned per operation.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    prefix: Option<String>,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!(url = %url, "connected to redis cache store");
        Ok(Self {
            connection,
            prefix: None,
        })
    }

    /// Namespace every key as `<prefix>:<key>`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn namespaced(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }
}

/// Redis expiries have one-second granularity; never round a TTL down to 0.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(self.namespaced(key), value, ttl_seconds(ttl))
            .await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = keys.iter().map(|key| self.namespaced(key)).collect();
        let mut conn = self.connection.clone();
        let deleted: u64 = conn.del(keys).await?;
        Ok(deleted)
    }
}
