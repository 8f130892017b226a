//! Cache backend implementations.
//!
//! This module provides concrete implementations of the
//! `arepo_core::cache::Cache` trait, selected via feature flags. Both may be
//! compiled in at once.
//!
//! # Feature Flags
//!
//! - `memory` (default): In-memory LRU cache using tokio synchronization primitives
//! - `redis`: Redis cache using the redis crate

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

#[cfg(feature = "memory")]
pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
