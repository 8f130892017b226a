mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::{DocumentStore, Repository};
pub use types::{
    document_id, ensure_id, id_filter, DeleteResult, Document, Filter, FindOneOptions,
    FindOptions, InsertManyResult, InsertOneResult, Projection, SortOrder, Update, UpdateResult,
    ID_FIELD,
};
