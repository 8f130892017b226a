//! Filter-hash cache layer.
//!
//! Caches query results under a SHA-256 digest of the filter's canonical
//! encoding. Nothing ever invalidates these entries, so results may be stale
//! for up to the TTL after a write.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use arepo_core::cache::{custom_namespace, filter_hash, Cache, CacheKey};
use arepo_core::storage::{Filter, Repository, RepositoryError, Result};

use super::read_through;

/// Segment for cached `find_one` results.
const ONE_SEGMENT: &str = "one";

/// Segment for cached `find` results.
const MANY_SEGMENT: &str = "many";

/// Read-through cache for filtered queries.
///
/// Obtained from [`CachedRepository::with_custom_filter`](super::CachedRepository::with_custom_filter).
///
/// # Keys
///
/// - `find_one`: `<radical>:custom:one:<hash>`
/// - `find`: `<radical>:custom:many:<hash>`
///
/// `<hash>` is the lowercase hex SHA-256 of the filter's canonical JSON.
/// Both shapes share the hash, so the extra segment keeps a cached list from
/// being read back as a single document.
pub struct FilterCache<R: ?Sized, C: ?Sized, T> {
    repository: Arc<R>,
    cache: Arc<C>,
    namespace: CacheKey,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<R: ?Sized, C: ?Sized, T> Clone for FilterCache<R, C, T> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            namespace: self.namespace.clone(),
            ttl: self.ttl,
            _marker: PhantomData,
        }
    }
}

impl<R, C, T> FilterCache<R, C, T>
where
    R: Repository<T> + ?Sized + 'static,
    C: Cache + ?Sized + 'static,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a layer writing under `<radical>:custom`.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        radical: impl Into<CacheKey>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            namespace: custom_namespace(&radical.into()),
            ttl,
            _marker: PhantomData,
        }
    }

    /// The `<radical>:custom` namespace.
    pub fn namespace(&self) -> &CacheKey {
        &self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, segment: &str, filter: &Filter) -> Result<CacheKey> {
        let hash =
            filter_hash(filter).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        Ok(self.namespace.add(segment).add(hash))
    }

    /// Cache key for a `find_one` with `filter`.
    pub fn key_for_one(&self, filter: &Filter) -> Result<CacheKey> {
        self.key(ONE_SEGMENT, filter)
    }

    /// Cache key for a `find` with `filter`.
    pub fn key_for_many(&self, filter: &Filter) -> Result<CacheKey> {
        self.key(MANY_SEGMENT, filter)
    }

    /// Gets the first document matching `filter`, through the cache.
    pub async fn find_one(&self, filter: &Filter) -> Result<T> {
        let key = self.key_for_one(filter)?;
        read_through(&self.cache, key, self.ttl, self.repository.find_one(filter)).await
    }

    /// Gets all documents matching `filter`, through the cache. Empty
    /// results are cached too.
    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>> {
        let key = self.key_for_many(filter)?;
        read_through(&self.cache, key, self.ttl, self.repository.find(filter)).await
    }
}
