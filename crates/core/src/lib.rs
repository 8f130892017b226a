//! Functional core for `arepo`: identifiers, repository and cache contracts,
//! cache keys and filter hashing, and pure document evaluation.
//!
//! Nothing in this crate performs I/O. Store and cache backends, the
//! store-backed repository and the cache-aside decorator live in the `arepo`
//! crate.

pub mod cache;
pub mod id;
pub mod query;
pub mod storage;

pub use id::{ObjectId, ObjectIdError};
