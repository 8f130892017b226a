//! Cache-aside decorators.
//!
//! [`CachedRepository`] wraps any `Repository<T>` and caches documents by
//! identifier; [`FilterCache`], obtained from it, caches query results by a
//! hash of the filter.
//!
//! - **Reads**: check the cache first; any cache failure is a miss. On a
//!   miss, fetch from the repository and populate the cache in a detached
//!   task.
//! - **Writes**: invalidate the identifier key in a detached task, then
//!   write through to the repository.
//!
//! The caller never waits on cache maintenance, and its failures are only
//! logged. Invalidation is best effort: a read racing an update can put the
//! old document back until the TTL expires.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(SqliteStore::open("arepo.db", "users").await?);
//! let users: Arc<StoreRepository<_, User>> = Arc::new(StoreRepository::new(store));
//! let cache = Arc::new(MemoryCache::new(10_000));
//!
//! let cached = CachedRepository::new(users, cache, "users", Duration::from_secs(300));
//! let by_email = cached.with_custom_filter();
//! ```

mod filter;
mod repository;

#[cfg(all(test, feature = "inmemory"))]
mod mocks;

pub use filter::FilterCache;
pub use repository::CachedRepository;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use arepo_core::cache::{encode, Cache, CacheExt, CacheKey};
use arepo_core::storage::Result;

/// Reads `key` from the cache, falling back to `fetch` on any cache failure.
///
/// A fetched value is written back in a detached task. Errors from `fetch`
/// are returned unchanged and nothing is cached for them.
async fn read_through<C, V, F>(
    cache: &Arc<C>,
    key: CacheKey,
    ttl: Duration,
    fetch: F,
) -> Result<V>
where
    C: Cache + ?Sized + 'static,
    V: Serialize + DeserializeOwned + Send + 'static,
    F: Future<Output = Result<V>> + Send,
{
    match cache.get_json::<V>(key.as_str()).await {
        Ok(Some(value)) => {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(value);
        }
        Ok(None) => tracing::trace!(key = %key, "Cache miss"),
        Err(err) if err.is_backend() => {
            tracing::debug!(key = %key, error = %err, "Cache unavailable, treating as miss")
        }
        Err(err) => {
            tracing::debug!(key = %key, error = %err, "Discarding undecodable cache entry")
        }
    }

    let value = fetch.await?;
    populate(cache, key, &value, ttl);
    Ok(value)
}

/// Writes `value` under `key` without waiting for the result.
fn populate<C, V>(cache: &Arc<C>, key: CacheKey, value: &V, ttl: Duration)
where
    C: Cache + ?Sized + 'static,
    V: Serialize + ?Sized,
{
    let bytes = match encode(value) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "Failed to encode value for cache");
            return;
        }
    };

    let cache = Arc::clone(cache);
    tokio::spawn(async move {
        if let Err(err) = cache.set(key.as_str(), &bytes, Some(ttl)).await {
            tracing::warn!(key = %key, error = %err, "Failed to populate cache");
        }
    });
}

/// Deletes `key` without waiting for the result.
fn invalidate<C>(cache: &Arc<C>, key: CacheKey)
where
    C: Cache + ?Sized + 'static,
{
    let cache = Arc::clone(cache);
    tokio::spawn(async move {
        if let Err(err) = cache.delete(key.as_str()).await {
            tracing::warn!(key = %key, error = %err, "Failed to invalidate cache");
        }
    });
}
