//! In-memory storage backend.
//!
//! Holds one collection in a map wrapped in `Arc<RwLock<_>>`. Useful for
//! tests and for development where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use arepo::storage::inmemory::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! // Wrap it in a StoreRepository...
//! ```

mod store;

pub use store::InMemoryStore;
