use async_trait::async_trait;

use crate::id::ObjectId;

use super::{
    DeleteResult, Document, Filter, FindOneOptions, FindOptions, InsertManyResult,
    InsertOneResult, Result, Update, UpdateResult,
};

/// A single collection of raw documents.
///
/// This is the boundary to the backing document store. Implementations
/// report counts; mapping counts to `NotFound`/`NotUpdated`/`NotDeleted` is
/// the repository's job.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the first document matching `filter`.
    async fn find_one(&self, filter: &Filter, options: &FindOneOptions)
        -> Result<Option<Document>>;

    /// Returns every document matching `filter`.
    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>>;

    /// Inserts a document. The store assigns `_id` when it is absent.
    async fn insert_one(&self, document: Document) -> Result<InsertOneResult>;

    /// Inserts documents in order.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyResult>;

    /// Applies `update` to the first document matching `filter`.
    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult>;

    /// Removes the first document matching `filter`.
    async fn delete_one(&self, filter: &Filter) -> Result<DeleteResult>;

    /// Atomically applies `update` to the first match and returns the
    /// document as it was before the update.
    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: &FindOneOptions,
    ) -> Result<Option<Document>>;
}

/// Typed CRUD access to one collection.
///
/// This is the capability set the cache-aside decorator wraps, so any
/// implementation (a store-backed repository, a test double, another
/// decorator) can be layered.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Gets a document by its identifier.
    async fn get_by_id(&self, id: ObjectId) -> Result<T>;

    /// Gets the first document matching `filter`.
    async fn find_one(&self, filter: &Filter) -> Result<T>;

    /// Gets all documents matching `filter`. No match is an empty list.
    async fn find(&self, filter: &Filter) -> Result<Vec<T>>;

    /// Inserts a document.
    async fn insert_one(&self, document: &T) -> Result<InsertOneResult>;

    /// Inserts several documents.
    async fn insert_many(&self, documents: &[T]) -> Result<InsertManyResult>;

    /// Applies `update` to the document with the given identifier.
    ///
    /// Fails with `NotFound` when no document has that identifier and with
    /// `NotUpdated` when it matched but nothing changed.
    async fn update_one_by_id(&self, id: ObjectId, update: &Update) -> Result<()>;

    /// Deletes the document with the given identifier.
    ///
    /// Fails with `NotDeleted` when nothing was removed.
    async fn delete_one_by_id(&self, id: ObjectId) -> Result<()>;
}
