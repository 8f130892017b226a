//! SQLite document store implementation.
//!
//! Bodies are stored as JSON text. Equality on `_id` is answered by the
//! primary key; every other filter is evaluated in Rust by
//! `arepo_core::query` over the collection in insertion order. Writes that
//! read first (`update_one`, `delete_one`, `find_one_and_update`) run inside
//! one transaction on the connection thread, so they are atomic with
//! respect to other calls on the same store.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;
use tokio_rusqlite::Connection;

use arepo_core::query::{apply_projection, apply_update, is_modified, matches, sort_documents};
use arepo_core::storage::{
    document_id, ensure_id, DeleteResult, Document, DocumentStore, Filter, FindOneOptions,
    FindOptions, InsertManyResult, InsertOneResult, Projection, RepositoryError, Result,
    SortOrder, Update, UpdateResult, ID_FIELD,
};

use super::error::{
    map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id, wrap_err, wrap_repository_err,
};
use super::schema;

/// Convert a `body` column to a document.
fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let body: String = row.get(0)?;
    serde_json::from_str(&body).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn to_body(document: &Document) -> tokio_rusqlite::Result<String> {
    serde_json::to_string(document)
        .map_err(|e| wrap_repository_err(RepositoryError::Serialization(e.to_string())))
}

/// Returns the identifier when the filter pins `_id` to a literal.
fn pinned_id(filter: &Filter) -> Option<&str> {
    filter.as_object()?.get(ID_FIELD).and_then(Value::as_str)
}

/// Loads the documents matching `filter` in insertion order.
fn select_matching(
    conn: &rusqlite::Connection,
    table: &str,
    filter: &Filter,
) -> tokio_rusqlite::Result<Vec<Document>> {
    let candidates = match pinned_id(filter) {
        Some(id) => conn
            .query_row(&schema::select_by_id(table), [id], row_to_document)
            .optional()
            .map_err(wrap_err)?
            .into_iter()
            .collect(),
        None => {
            let mut stmt = conn.prepare(&schema::select_all(table)).map_err(wrap_err)?;
            let rows = stmt.query_map([], row_to_document).map_err(wrap_err)?;

            let mut documents = Vec::new();
            for row_result in rows {
                documents.push(row_result.map_err(wrap_err)?);
            }
            documents
        }
    };

    let mut found = Vec::with_capacity(candidates.len());
    for document in candidates {
        if matches(&document, filter).map_err(wrap_repository_err)? {
            found.push(document);
        }
    }
    Ok(found)
}

/// Returns the first match, honouring `sort`.
fn select_first(
    conn: &rusqlite::Connection,
    table: &str,
    filter: &Filter,
    sort: &[(String, SortOrder)],
) -> tokio_rusqlite::Result<Option<Document>> {
    let mut found = select_matching(conn, table, filter)?;
    sort_documents(&mut found, sort);
    Ok(found.into_iter().next())
}

fn stored_id(document: &Document) -> tokio_rusqlite::Result<String> {
    document_id(document).map(|id| id.to_hex()).ok_or_else(|| {
        wrap_repository_err(RepositoryError::InvalidData(
            "stored document has no valid _id".to_string(),
        ))
    })
}

fn project(document: Document, projection: Option<&Projection>) -> Result<Document> {
    match projection {
        Some(projection) if !projection.is_empty() => apply_projection(&document, projection),
        _ => Ok(document),
    }
}

/// SQLite storage backend for one collection.
///
/// Provides async access through a `tokio_rusqlite` connection, which runs
/// every statement on a dedicated thread.
pub struct SqliteStore {
    conn: Connection,
    table: Arc<str>,
}

impl SqliteStore {
    /// Opens the collection in a file-based database.
    ///
    /// The database file and the collection's table are created if they
    /// don't exist.
    pub async fn open(path: &str, collection: &str) -> Result<Self> {
        schema::validate_collection(collection)?;

        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(conn, collection).await
    }

    /// Opens the collection in an in-memory database.
    ///
    /// Useful for testing - data is lost when the store is dropped.
    pub async fn open_in_memory(collection: &str) -> Result<Self> {
        schema::validate_collection(collection)?;

        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(conn, collection).await
    }

    /// Name of the backing table.
    pub fn collection(&self) -> &str {
        &self.table
    }

    async fn init_schema(conn: Connection, collection: &str) -> Result<Self> {
        let table: Arc<str> = Arc::from(collection);
        let ddl = schema::create_table(&table);

        conn.call(move |conn| {
            conn.execute_batch(&ddl).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(Self { conn, table })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_one(
        &self,
        filter: &Filter,
        options: &FindOneOptions,
    ) -> Result<Option<Document>> {
        let table = Arc::clone(&self.table);
        let filter = filter.clone();
        let sort = options.sort.clone();

        let document = self
            .conn
            .call(move |conn| select_first(conn, &table, &filter, &sort))
            .await
            .map_err(map_tokio_rusqlite_error)?;

        document
            .map(|document| project(document, options.projection.as_ref()))
            .transpose()
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        let table = Arc::clone(&self.table);
        let filter = filter.clone();

        let mut documents = self
            .conn
            .call(move |conn| select_matching(conn, &table, &filter))
            .await
            .map_err(map_tokio_rusqlite_error)?;

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
        let id_str = id.to_hex();
        let table = Arc::clone(&self.table);

        self.conn
            .call(move |conn| {
                let body = to_body(&document)?;
                conn.execute(&schema::insert(&table), params![id_str, body])
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, id.to_hex()))?;

        Ok(InsertOneResult { inserted_id: id })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyResult> {
        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = ensure_id(&mut document)?;
            prepared.push((id, document));
        }
        let inserted_ids: Vec<_> = prepared.iter().map(|(id, _)| *id).collect();
        let table = Arc::clone(&self.table);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                {
                    let mut stmt = tx.prepare(&schema::insert(&table)).map_err(wrap_err)?;
                    for (id, document) in &prepared {
                        let body = to_body(document)?;
                        stmt.execute(params![id.to_hex(), body]).map_err(|e| {
                            wrap_repository_err(map_tokio_rusqlite_error_with_id(
                                wrap_err(e),
                                id.to_hex(),
                            ))
                        })?;
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;

        Ok(InsertManyResult { inserted_ids })
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult> {
        let table = Arc::clone(&self.table);
        let filter = filter.clone();
        let update = update.clone();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let Some(before) = select_first(&tx, &table, &filter, &[])? else {
                    return Ok(UpdateResult::default());
                };

                let after = apply_update(&before, &update).map_err(wrap_repository_err)?;
                if !is_modified(&before, &after) {
                    return Ok(UpdateResult {
                        matched_count: 1,
                        modified_count: 0,
                    });
                }

                let body = to_body(&after)?;
                tx.execute(&schema::update_body(&table), params![stored_id(&before)?, body])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;

                Ok(UpdateResult {
                    matched_count: 1,
                    modified_count: 1,
                })
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteResult> {
        let table = Arc::clone(&self.table);
        let filter = filter.clone();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let Some(document) = select_first(&tx, &table, &filter, &[])? else {
                    return Ok(DeleteResult::default());
                };

                let rows = tx
                    .execute(&schema::delete_by_id(&table), [stored_id(&document)?])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;

                Ok(DeleteResult {
                    deleted_count: rows as u64,
                })
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: &FindOneOptions,
    ) -> Result<Option<Document>> {
        let table = Arc::clone(&self.table);
        let filter = filter.clone();
        let update = update.clone();
        let sort = options.sort.clone();

        let before = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let Some(before) = select_first(&tx, &table, &filter, &sort)? else {
                    return Ok(None);
                };

                let after = apply_update(&before, &update).map_err(wrap_repository_err)?;
                let body = to_body(&after)?;
                tx.execute(&schema::update_body(&table), params![stored_id(&before)?, body])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;

                Ok(Some(before))
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;

        before
            .map(|document| project(document, options.projection.as_ref()))
            .transpose()
    }
}
