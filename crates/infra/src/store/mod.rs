//! Catalog and cart store boundaries.
//!
//! The reservation engine only talks to these traits; backends decide how the
//! per-row atomicity they promise is achieved.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryCartStore, InMemoryCatalogStore};
pub use r#trait::{CartStore, CatalogStore, StoreError};
