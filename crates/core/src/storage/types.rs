use serde_json::{json, Map, Value};

use crate::id::ObjectId;

use super::{RepositoryError, Result};

/// Name of the identifier field in stored documents.
pub const ID_FIELD: &str = "_id";

/// A stored document in its wire form.
pub type Document = Map<String, Value>;

/// An opaque query predicate, passed through to the store unmodified.
pub type Filter = Value;

/// An opaque update description, passed through to the store unmodified.
pub type Update = Value;

/// Returns the filter matching the document with the given identifier.
pub fn id_filter(id: ObjectId) -> Filter {
    json!({ ID_FIELD: id.to_hex() })
}

/// Reads the document's `_id`, assigning a fresh identifier when it is
/// missing, null or nil.
///
/// Stores call this on insert so that identifiers are always present and
/// always in hex form.
pub fn ensure_id(document: &mut Document) -> Result<ObjectId> {
    let existing = match document.get(ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(hex)) => Some(ObjectId::parse_str(hex)?),
        Some(other) => Some(
            serde_json::from_value::<ObjectId>(other.clone())
                .map_err(|e| RepositoryError::InvalidData(format!("invalid _id: {e}")))?,
        ),
    };

    let id = match existing {
        Some(id) if !id.is_nil() => id,
        _ => ObjectId::new(),
    };
    document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
    Ok(id)
}

/// Reads the `_id` of a stored document.
pub fn document_id(document: &Document) -> Option<ObjectId> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|hex| ObjectId::parse_str(hex).ok())
}

/// Store-assigned metadata for a single insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOneResult {
    pub inserted_id: ObjectId,
}

/// Store-assigned metadata for a batch insert, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<ObjectId>,
}

/// Counts reported by a single-document update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Counts reported by a single-document delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// An ordered list of `(field, included)` pairs.
///
/// Fields are accumulated in call order. Whether inclusion and exclusion may
/// be mixed is decided by the store evaluating the projection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    fields: Vec<(String, bool)>,
}

impl Projection {
    /// Creates an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds inclusion entries.
    pub fn include<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|field| (field.into(), true)));
    }

    /// Adds exclusion entries.
    pub fn exclude<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|field| (field.into(), false)));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates `(field, included)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.fields
            .iter()
            .map(|(field, included)| (field.as_str(), *included))
    }
}

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Options for single-document reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindOneOptions {
    pub projection: Option<Projection>,
    pub sort: Vec<(String, SortOrder)>,
}

impl FindOneOptions {
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }
}

/// Options for multi-document reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Vec<(String, SortOrder)>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
