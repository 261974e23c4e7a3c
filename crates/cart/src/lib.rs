//! Cart domain module.
//!
//! Cart lines are reservation claims against catalog stock. This crate holds
//! the line record, its price snapshot rules, totals and the checkout receipt,
//! implemented as deterministic domain logic (no IO, no storage).

pub mod item;
pub mod receipt;

pub use item::{CartItem, NewCartItem, compute_total};
pub use receipt::{CheckoutReceipt, ReceiptLine};
