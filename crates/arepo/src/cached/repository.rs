//! Cache-aside repository decorator.
//!
//! Wraps a `Repository<T>` implementation and caches documents by
//! identifier.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use arepo_core::cache::{id_key, id_namespace, Cache, CacheKey};
use arepo_core::storage::{Filter, InsertManyResult, InsertOneResult, Repository, Result, Update};
use arepo_core::ObjectId;

use super::{invalidate, read_through, FilterCache};

/// Cache-aside decorator for any `Repository<T>`.
///
/// - **Reads by id**: check the cache under `<radical>:_id:<hex>`, on a miss
///   fetch from the repository and populate the cache in the background
/// - **Updates and deletes by id**: invalidate that key in the background,
///   then write through
/// - **Everything else**: passed through uncached
///
/// Construction is the only configuration point; the decorator holds no
/// mutable state and may be shared freely.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
/// * `T` - The document type
pub struct CachedRepository<R: ?Sized, C: ?Sized, T> {
    repository: Arc<R>,
    cache: Arc<C>,
    radical: CacheKey,
    id_namespace: CacheKey,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<R: ?Sized, C: ?Sized, T> Clone for CachedRepository<R, C, T> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            radical: self.radical.clone(),
            id_namespace: self.id_namespace.clone(),
            ttl: self.ttl,
            _marker: PhantomData,
        }
    }
}

impl<R, C, T> CachedRepository<R, C, T>
where
    R: Repository<T> + ?Sized + 'static,
    C: Cache + ?Sized + 'static,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a new cached repository.
    ///
    /// # Arguments
    ///
    /// * `repository` - The underlying repository to cache
    /// * `cache` - The cache implementation
    /// * `radical` - Namespace prefix for every key this decorator writes
    /// * `ttl` - Time-to-live for cached documents
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        radical: impl Into<CacheKey>,
        ttl: Duration,
    ) -> Self {
        let radical = radical.into();
        let id_namespace = id_namespace(&radical);
        Self {
            repository,
            cache,
            radical,
            id_namespace,
            ttl,
            _marker: PhantomData,
        }
    }

    pub fn radical(&self) -> &CacheKey {
        &self.radical
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for the document with the given identifier.
    pub fn key_for(&self, id: ObjectId) -> CacheKey {
        id_key(&self.id_namespace, id)
    }

    /// Returns a filter-hash layer over the same repository, cache and TTL.
    pub fn with_custom_filter(&self) -> FilterCache<R, C, T> {
        FilterCache::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.cache),
            self.radical.clone(),
            self.ttl,
        )
    }
}

#[async_trait]
impl<R, C, T> Repository<T> for CachedRepository<R, C, T>
where
    R: Repository<T> + ?Sized + 'static,
    C: Cache + ?Sized + 'static,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get_by_id(&self, id: ObjectId) -> Result<T> {
        let key = self.key_for(id);
        read_through(&self.cache, key, self.ttl, self.repository.get_by_id(id)).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<T> {
        self.repository.find_one(filter).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>> {
        self.repository.find(filter).await
    }

    async fn insert_one(&self, document: &T) -> Result<InsertOneResult> {
        self.repository.insert_one(document).await
    }

    async fn insert_many(&self, documents: &[T]) -> Result<InsertManyResult> {
        self.repository.insert_many(documents).await
    }

    async fn update_one_by_id(&self, id: ObjectId, update: &Update) -> Result<()> {
        invalidate(&self.cache, self.key_for(id));

        self.repository.update_one_by_id(id, update).await?;

        tracing::debug!(id = %id, "Document updated");
        Ok(())
    }

    async fn delete_one_by_id(&self, id: ObjectId) -> Result<()> {
        invalidate(&self.cache, self.key_for(id));

        self.repository.delete_one_by_id(id).await?;

        tracing::debug!(id = %id, "Document deleted");
        Ok(())
    }
}
