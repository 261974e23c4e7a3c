//! Catalog domain module.
//!
//! This crate contains the product record the reservation engine reads and the
//! pure rules for moving its available stock (no IO, no storage).

pub mod product;

pub use product::{NewProduct, Pricing, Product};
