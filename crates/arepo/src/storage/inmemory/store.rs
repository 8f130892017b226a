//! In-memory document store implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use arepo_core::query::{
    apply_projection, apply_update, compare_documents, is_modified, matches, sort_documents,
};
use arepo_core::storage::{
    document_id, ensure_id, DeleteResult, Document, DocumentStore, Filter, FindOneOptions,
    FindOptions, InsertManyResult, InsertOneResult, Projection, RepositoryError, Result,
    SortOrder, Update, UpdateResult,
};

/// Documents keyed by insertion ordinal, with an `_id` index.
#[derive(Debug, Default)]
struct Collection {
    documents: BTreeMap<u64, Document>,
    by_id: HashMap<String, u64>,
    next_ordinal: u64,
}

impl Collection {
    fn insert(&mut self, id: String, document: Document) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.by_id.insert(id, ordinal);
        self.documents.insert(ordinal, document);
    }

    fn remove(&mut self, ordinal: u64) -> Option<Document> {
        let document = self.documents.remove(&ordinal)?;
        if let Some(id) = document_id(&document) {
            self.by_id.remove(&id.to_hex());
        }
        Some(document)
    }

    /// Returns matching documents in insertion order, paired with their
    /// ordinals.
    fn matching(&self, filter: &Filter) -> Result<Vec<(u64, &Document)>> {
        let mut found = Vec::new();
        for (ordinal, document) in &self.documents {
            if matches(document, filter)? {
                found.push((*ordinal, document));
            }
        }
        Ok(found)
    }

    /// Returns the ordinal of the first match, honouring `sort`.
    fn first_match(&self, filter: &Filter, sort: &[(String, SortOrder)]) -> Result<Option<u64>> {
        let mut found = self.matching(filter)?;
        found.sort_by(|(_, a), (_, b)| compare_documents(a, b, sort));
        Ok(found.first().map(|(ordinal, _)| *ordinal))
    }
}

fn project(document: Document, projection: Option<&Projection>) -> Result<Document> {
    match projection {
        Some(projection) if !projection.is_empty() => apply_projection(&document, projection),
        _ => Ok(document),
    }
}

/// In-memory storage backend for one collection.
///
/// Uses a map wrapped in `Arc<RwLock<_>>` for thread-safe access. Clones
/// share the same collection. Data is not persisted and is lost when the
/// last handle is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collection: Arc<RwLock<Collection>>,
}

impl InMemoryStore {
    /// Creates a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.collection.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_one(
        &self,
        filter: &Filter,
        options: &FindOneOptions,
    ) -> Result<Option<Document>> {
        let collection = self.collection.read().await;
        let Some(ordinal) = collection.first_match(filter, &options.sort)? else {
            return Ok(None);
        };
        let document = collection.documents[&ordinal].clone();
        project(document, options.projection.as_ref()).map(Some)
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = {
            let collection = self.collection.read().await;
            collection
                .matching(filter)?
                .into_iter()
                .map(|(_, document)| document.clone())
                .collect()
        };

        sort_documents(&mut documents, &options.sort);

        documents
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|document| project(document, options.projection.as_ref()))
            .collect()
    }

    async fn insert_one(&self, mut document: Document) -> Result<InsertOneResult> {
        let id = ensure_id(&mut document)?;
        let hex = id.to_hex();

        let mut collection = self.collection.write().await;
        if collection.by_id.contains_key(&hex) {
            return Err(RepositoryError::AlreadyExists { id: hex });
        }
        collection.insert(hex, document);

        Ok(InsertOneResult { inserted_id: id })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyResult> {
        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = ensure_id(&mut document)?;
            prepared.push((id, document));
        }

        let mut collection = self.collection.write().await;

        // The batch is validated up front so it is inserted all or nothing.
        let mut seen = std::collections::HashSet::new();
        for (id, _) in &prepared {
            let hex = id.to_hex();
            if collection.by_id.contains_key(&hex) || !seen.insert(hex.clone()) {
                return Err(RepositoryError::AlreadyExists { id: hex });
            }
        }

        let mut inserted_ids = Vec::with_capacity(prepared.len());
        for (id, document) in prepared {
            collection.insert(id.to_hex(), document);
            inserted_ids.push(id);
        }

        Ok(InsertManyResult { inserted_ids })
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult> {
        let mut collection = self.collection.write().await;
        let Some(ordinal) = collection.first_match(filter, &[])? else {
            return Ok(UpdateResult::default());
        };

        let before = &collection.documents[&ordinal];
        let after = apply_update(before, update)?;
        if !is_modified(before, &after) {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }

        collection.documents.insert(ordinal, after);
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteResult> {
        let mut collection = self.collection.write().await;
        let Some(ordinal) = collection.first_match(filter, &[])? else {
            return Ok(DeleteResult::default());
        };

        let deleted_count = u64::from(collection.remove(ordinal).is_some());
        Ok(DeleteResult { deleted_count })
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: &FindOneOptions,
    ) -> Result<Option<Document>> {
        let mut collection = self.collection.write().await;
        let Some(ordinal) = collection.first_match(filter, &options.sort)? else {
            return Ok(None);
        };

        let before = collection.documents[&ordinal].clone();
        let after = apply_update(&before, update)?;
        collection.documents.insert(ordinal, after);

        project(before, options.projection.as_ref()).map(Some)
    }
}
