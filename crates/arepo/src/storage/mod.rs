//! Document store implementations.
//!
//! This module provides concrete implementations of the
//! `arepo_core::storage::DocumentStore` trait, selected via feature flags.
//! Unlike caches, several stores may be compiled in at once.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): in-process store backed by a map
//! - `sqlite`: SQLite store using `rusqlite` and `tokio-rusqlite`
//!
//! # Examples
//!
//! Build with SQLite:
//! ```bash
//! cargo build -p arepo --features sqlite
//! ```

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
