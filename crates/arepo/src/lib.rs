//! Typed document repositories with a cache-aside overlay.
//!
//! - [`repository::StoreRepository`] is the store gateway: typed CRUD over
//!   one collection of any `arepo_core::storage::DocumentStore`, plus
//!   projected reads.
//! - [`cached::CachedRepository`] decorates any `Repository<T>` with an
//!   identifier-keyed cache, and hands out a [`cached::FilterCache`] for
//!   filter-keyed query caching.
//! - [`storage`] and [`cache`] hold the shipped store and cache backends.

pub mod cache;
pub mod cached;
pub mod config;
pub mod repository;
pub mod storage;

pub use arepo_core::cache::{Cache, CacheError, CacheKey};
pub use arepo_core::storage::{DocumentStore, Repository, RepositoryError};
pub use arepo_core::{ObjectId, ObjectIdError};
pub use config::Config;
