//! Store-backed repository implementation.
//!
//! [`StoreRepository`] is the raw gateway: it encodes typed documents, runs
//! them through a [`DocumentStore`], and turns the store's counts into the
//! `NotFound`/`NotUpdated`/`NotDeleted` outcomes of the repository contract.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use arepo_core::storage::{
    id_filter, Document, DocumentStore, Filter, FindOneOptions, FindOptions, InsertManyResult,
    InsertOneResult, Repository, RepositoryError, Result, Update, UpdateResult,
};
use arepo_core::ObjectId;

use super::projected::Projected;

/// Encodes a typed document into its stored form.
fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(RepositoryError::Serialization(format!(
            "documents must encode to a JSON object, got {}",
            kind(&other)
        ))),
        Err(e) => Err(RepositoryError::Serialization(e.to_string())),
    }
}

/// Decodes a stored document into `T`.
fn from_document<T: DeserializeOwned>(document: Document) -> Result<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_update(result: UpdateResult) -> Result<()> {
    if result.matched_count == 0 {
        return Err(RepositoryError::NotFound);
    }
    if result.modified_count == 0 {
        return Err(RepositoryError::NotUpdated);
    }
    Ok(())
}

/// Typed repository over one collection of a [`DocumentStore`].
///
/// Holds nothing but the collection handle and an optional per-operation
/// deadline, so clones are cheap and share the collection.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use arepo::repository::StoreRepository;
/// use arepo::storage::InMemoryStore;
///
/// let users: StoreRepository<_, User> = StoreRepository::new(Arc::new(InMemoryStore::new()));
/// let id = users.insert_one(&user).await?.inserted_id;
/// let user = users.get_by_id(id).await?;
/// ```
pub struct StoreRepository<S: ?Sized, T> {
    store: Arc<S>,
    timeout: Option<Duration>,
    _marker: PhantomData<fn() -> T>,
}

impl<S: ?Sized, T> Clone for StoreRepository<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
            _marker: PhantomData,
        }
    }
}

impl<S, T> StoreRepository<S, T>
where
    S: DocumentStore + ?Sized,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a repository over the given collection.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            timeout: None,
            _marker: PhantomData,
        }
    }

    /// Fails every operation that takes longer than `timeout` with
    /// [`RepositoryError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the underlying collection handle.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) async fn run<F, R>(&self, operation: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, operation)
                .await
                .map_err(|_| RepositoryError::Timeout)?,
            None => operation.await,
        }
    }

    /// Gets the first document matching `filter` with explicit store options.
    pub async fn find_one_with(&self, filter: &Filter, options: &FindOneOptions) -> Result<T> {
        let document = self
            .run(self.store.find_one(filter, options))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        from_document(document)
    }

    /// Gets all documents matching `filter` with explicit store options.
    pub async fn find_with(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<T>> {
        self.run(self.store.find(filter, options))
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub(crate) async fn find_one_and_update_with(
        &self,
        filter: &Filter,
        update: &Update,
        options: &FindOneOptions,
    ) -> Result<T> {
        let document = self
            .run(self.store.find_one_and_update(filter, update, options))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        from_document(document)
    }

    /// Applies `update` to the first match and returns the document as it
    /// was before the update.
    pub async fn find_one_and_update(&self, filter: &Filter, update: &Update) -> Result<T> {
        self.find_one_and_update_with(filter, update, &FindOneOptions::default())
            .await
    }

    /// Applies `update` to the first document matching `filter`.
    ///
    /// Fails with `NotFound` when nothing matched and with `NotUpdated` when
    /// the match was left unchanged.
    pub async fn update_one(&self, filter: &Filter, update: &Update) -> Result<()> {
        check_update(self.run(self.store.update_one(filter, update)).await?)
    }

    /// Deletes the first document matching `filter`.
    pub async fn delete_one(&self, filter: &Filter) -> Result<()> {
        let result = self.run(self.store.delete_one(filter)).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::NotDeleted);
        }
        Ok(())
    }

    /// Starts a projected read including `fields`.
    pub fn select<I, F>(&self, fields: I) -> Projected<'_, S, T>
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Projected::new(self).select(fields)
    }

    /// Starts a projected read excluding `fields`.
    pub fn omit<I, F>(&self, fields: I) -> Projected<'_, S, T>
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Projected::new(self).omit(fields)
    }
}

#[async_trait]
impl<S, T> Repository<T> for StoreRepository<S, T>
where
    S: DocumentStore + ?Sized,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get_by_id(&self, id: ObjectId) -> Result<T> {
        self.find_one_with(&id_filter(id), &FindOneOptions::default())
            .await
    }

    async fn find_one(&self, filter: &Filter) -> Result<T> {
        self.find_one_with(filter, &FindOneOptions::default()).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>> {
        self.find_with(filter, &FindOptions::default()).await
    }

    async fn insert_one(&self, document: &T) -> Result<InsertOneResult> {
        let document = to_document(document)?;
        self.run(self.store.insert_one(document)).await
    }

    async fn insert_many(&self, documents: &[T]) -> Result<InsertManyResult> {
        let documents = documents
            .iter()
            .map(to_document)
            .collect::<Result<Vec<_>>>()?;
        self.run(self.store.insert_many(documents)).await
    }

    async fn update_one_by_id(&self, id: ObjectId, update: &Update) -> Result<()> {
        self.update_one(&id_filter(id), update).await
    }

    async fn delete_one_by_id(&self, id: ObjectId) -> Result<()> {
        self.delete_one(&id_filter(id)).await
    }
}
