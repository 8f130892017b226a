//! Projected reads on top of a [`StoreRepository`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use arepo_core::storage::{
    id_filter, DocumentStore, Filter, FindOneOptions, FindOptions, Projection, RepositoryError,
    Result, Update,
};
use arepo_core::ObjectId;

use super::store::StoreRepository;

/// A read accessor that returns only the selected fields.
///
/// Built with [`StoreRepository::select`] or [`StoreRepository::omit`] and
/// refined by chaining more calls. Every read fails with
/// [`RepositoryError::ProjectionRequired`] while no field has been named,
/// without reaching the store.
///
/// Fields left out of the projection must be optional or defaulted in `T`
/// for the result to decode.
pub struct Projected<'a, S: ?Sized, T> {
    repository: &'a StoreRepository<S, T>,
    projection: Projection,
}

impl<'a, S, T> Projected<'a, S, T>
where
    S: DocumentStore + ?Sized,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(repository: &'a StoreRepository<S, T>) -> Self {
        Self {
            repository,
            projection: Projection::new(),
        }
    }

    /// Includes `fields` in the result.
    pub fn select<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.projection.include(fields);
        self
    }

    /// Excludes `fields` from the result.
    pub fn omit<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.projection.exclude(fields);
        self
    }

    /// The accumulated projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn required(&self) -> Result<Projection> {
        if self.projection.is_empty() {
            return Err(RepositoryError::ProjectionRequired);
        }
        Ok(self.projection.clone())
    }

    pub async fn get_by_id(&self, id: ObjectId) -> Result<T> {
        self.find_one(&id_filter(id)).await
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<T> {
        let options = FindOneOptions::default().with_projection(self.required()?);
        self.repository.find_one_with(filter, &options).await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>> {
        let options = FindOptions::default().with_projection(self.required()?);
        self.repository.find_with(filter, &options).await
    }

    /// Applies `update` and returns the projected document as it was
    /// before the update.
    pub async fn find_one_and_update(&self, filter: &Filter, update: &Update) -> Result<T> {
        let options = FindOneOptions::default().with_projection(self.required()?);
        self.repository
            .find_one_and_update_with(filter, update, &options)
            .await
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use arepo_core::storage::{
        DeleteResult, Document, InsertManyResult, InsertOneResult, Repository, UpdateResult,
    };

    use crate::storage::InMemoryStore;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Account {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        name: String,
        email: String,
        balance: i64,
    }

    fn account(name: &str, balance: i64) -> Account {
        Account {
            id: None,
            name: name.to_string(),
            email: format!("{name}@example.com"),
            balance,
        }
    }

    #[tokio::test]
    async fn test_select_returns_only_named_fields() {
        let repo: StoreRepository<InMemoryStore, Account> =
            StoreRepository::new(Arc::new(InMemoryStore::new()));
        let id = repo.insert_one(&account("x", 10)).await.unwrap().inserted_id;

        let found: Account = repo.select(["name"]).get_by_id(id).await.unwrap();

        assert_eq!(found.id, Some(id));
        assert_eq!(found.name, "x");
        assert_eq!(found.email, "");
        assert_eq!(found.balance, 0);
    }

    #[tokio::test]
    async fn test_omit_drops_named_fields() {
        let repo: StoreRepository<InMemoryStore, Account> =
            StoreRepository::new(Arc::new(InMemoryStore::new()));
        repo.insert_one(&account("x", 10)).await.unwrap();

        let found: Vec<Account> = repo
            .omit(["email", "balance"])
            .find(&json!({ "name": "x" }))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "x");
        assert_eq!(found[0].email, "");
    }

    #[tokio::test]
    async fn test_chained_calls_accumulate() {
        let repo: StoreRepository<InMemoryStore, Account> =
            StoreRepository::new(Arc::new(InMemoryStore::new()));

        let projected = repo.select(["name"]).select(["email"]).omit(["_id"]);
        let fields: Vec<_> = projected.projection().iter().collect();

        assert_eq!(fields, vec![("name", true), ("email", true), ("_id", false)]);
    }

    #[tokio::test]
    async fn test_find_one_and_update_projects_previous_state() {
        let repo: StoreRepository<InMemoryStore, Account> =
            StoreRepository::new(Arc::new(InMemoryStore::new()));
        let id = repo.insert_one(&account("x", 10)).await.unwrap().inserted_id;

        let before: Account = repo
            .select(["balance"])
            .find_one_and_update(&id_filter(id), &json!({ "$inc": { "balance": 5 } }))
            .await
            .unwrap();

        assert_eq!(before.balance, 10);
        assert_eq!(before.name, "");
        assert_eq!(repo.get_by_id(id).await.unwrap().balance, 15);
    }

    /// Store that counts reads and never finds anything.
    #[derive(Default)]
    struct CountingStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn find_one(&self, _: &Filter, _: &FindOneOptions) -> Result<Option<Document>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn find(&self, _: &Filter, _: &FindOptions) -> Result<Vec<Document>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn insert_one(&self, _: Document) -> Result<InsertOneResult> {
            Ok(InsertOneResult {
                inserted_id: ObjectId::new(),
            })
        }

        async fn insert_many(&self, _: Vec<Document>) -> Result<InsertManyResult> {
            Ok(InsertManyResult::default())
        }

        async fn update_one(&self, _: &Filter, _: &Update) -> Result<UpdateResult> {
            Ok(UpdateResult::default())
        }

        async fn delete_one(&self, _: &Filter) -> Result<DeleteResult> {
            Ok(DeleteResult::default())
        }

        async fn find_one_and_update(
            &self,
            _: &Filter,
            _: &Update,
            _: &FindOneOptions,
        ) -> Result<Option<Document>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_empty_projection_is_required_for_every_read() {
        let store = Arc::new(CountingStore::default());
        let repo: StoreRepository<CountingStore, Account> = StoreRepository::new(store.clone());

        let empty = repo.select(Vec::<String>::new());

        for id in [ObjectId::new(), ObjectId::NIL, ObjectId::new()] {
            assert_eq!(
                empty.get_by_id(id).await.unwrap_err(),
                RepositoryError::ProjectionRequired
            );
        }
        assert_eq!(
            empty.find_one(&json!({})).await.unwrap_err(),
            RepositoryError::ProjectionRequired
        );
        assert_eq!(
            empty.find(&json!({})).await.unwrap_err(),
            RepositoryError::ProjectionRequired
        );
        assert_eq!(
            empty
                .find_one_and_update(&json!({}), &json!({ "$set": { "name": "y" } }))
                .await
                .unwrap_err(),
            RepositoryError::ProjectionRequired
        );

        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }
}
