//! Cache-aside data layer.
//!
//! - [`CacheStore`] — key/value store with per-entry TTL. Implemented by
//!   [`MemoryStore`] (in-process moka cache) and, with the `redis` feature,
//!   [`RedisStore`] (shared across process instances).
//!
//! - [`ReadThroughCache`] — generic get-or-load helper over any store.
//!   Store failures degrade to a miss on read and are logged on write; the
//!   authoritative path never depends on the cache.
//!
//! - [`InvalidationPublisher`] — fire-and-forget deletion of the
//!   [`InvalidationSet`] computed by a mutation.
//!
//! Keys are built with [`CacheKey`] so that a logical entity always maps to
//! the same string.
//!
//! # Consistency
//!
//! Invalidation runs after the mutation's response has been produced, so a
//! read racing the mutation may observe the old value until the deletion
//! lands. Concurrent misses for the same key may each invoke the loader
//! and each write the entry; the last write wins.

mod invalidation;
mod key;
mod memory;
mod read_through;
#[cfg(feature = "redis")]
mod redis;

pub use invalidation::{InvalidationPublisher, InvalidationSet};
pub use key::CacheKey;
pub use memory::MemoryStore;
pub use read_through::ReadThroughCache;
#[cfg(feature = "redis")]
pub use redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Key/value store with per-entry TTL.
///
/// Values are opaque bytes; serialization is the caller's concern.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value, replacing any previous entry, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Delete keys. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64>;
}
