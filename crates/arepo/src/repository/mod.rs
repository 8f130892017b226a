//! The store gateway.
//!
//! [`StoreRepository`] implements `arepo_core::storage::Repository` over any
//! [`DocumentStore`](arepo_core::storage::DocumentStore) and adds the
//! raw-gateway-only operations: filter-based writes, store options, and
//! projected reads through [`Projected`].

mod projected;
mod store;

pub use projected::Projected;
pub use store::StoreRepository;
