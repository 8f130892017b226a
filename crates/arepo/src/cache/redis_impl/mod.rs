//! Redis cache backend.
//!
//! Lets several processes share one cache, so an invalidation issued by one
//! of them is seen by the rest.

mod cache;
mod error;

pub use cache::RedisCache;
