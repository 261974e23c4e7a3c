//! `cartstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, optimistic-concurrency versions and the domain error model.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CartItemId, CustomerId, ProductCode, VendorId};
pub use value_object::{Money, ValueObject};
pub use version::ExpectedVersion;
