use std::sync::Arc;

use thiserror::Error;

use cartstock_cart::{CartItem, NewCartItem};
use cartstock_catalog::Product;
use cartstock_core::{CartItemId, CustomerId, ExpectedVersion, ProductCode};

/// Store operation error.
///
/// These are outcomes reported by a backing store. `Unavailable` is the only
/// variant that represents a fault rather than a business outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("insufficient stock for {product_code}: requested {requested}, available {available}")]
    Insufficient {
        product_code: String,
        requested: u32,
        available: u32,
    },

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn product_not_found(code: &ProductCode) -> Self {
        Self::NotFound {
            entity: "product",
            key: code.to_string(),
        }
    }

    pub fn cart_item_not_found(id: CartItemId) -> Self {
        Self::NotFound {
            entity: "cart item",
            key: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Product catalog store.
///
/// ## Atomicity
///
/// `apply_delta` is the engine's only write primitive against stock. It must
/// check and apply the delta as one step per product row (row lock or
/// version check), so two concurrent reservations against the same product
/// cannot both pass the availability check.
pub trait CatalogStore: Send + Sync {
    /// Look up a product by code.
    fn get_by_code(&self, code: &ProductCode) -> Result<Option<Product>, StoreError>;

    /// Atomically add `delta` (negative reserves, positive releases) to the
    /// product's available quantity.
    ///
    /// Fails with `Insufficient` when the result would be negative, leaving the
    /// product unchanged.
    fn apply_delta(&self, code: &ProductCode, delta: i64) -> Result<Product, StoreError>;
}

/// Active cart line store.
///
/// Implementations must enforce at most one line per (customer, product) pair
/// on `create` and `reinstate`.
pub trait CartStore: Send + Sync {
    fn find_by_customer_and_code(
        &self,
        customer_id: CustomerId,
        code: &ProductCode,
    ) -> Result<Option<CartItem>, StoreError>;

    fn find_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    /// All active lines of a customer, oldest first.
    fn find_all_by_customer(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, StoreError>;

    fn create(&self, fields: NewCartItem) -> Result<CartItem, StoreError>;

    /// Set a line's quantity, guarded by the line version.
    fn update_quantity(
        &self,
        id: CartItemId,
        quantity: u32,
        expected_version: ExpectedVersion,
    ) -> Result<CartItem, StoreError>;

    /// Remove a line, returning what was removed.
    fn delete_by_id(&self, id: CartItemId) -> Result<CartItem, StoreError>;

    /// Remove every line of a customer as one unit, returning the removed lines.
    fn delete_all_by_customer(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, StoreError>;

    /// Put back a previously removed line unchanged. Used for compensation.
    fn reinstate(&self, item: CartItem) -> Result<(), StoreError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn get_by_code(&self, code: &ProductCode) -> Result<Option<Product>, StoreError> {
        (**self).get_by_code(code)
    }

    fn apply_delta(&self, code: &ProductCode, delta: i64) -> Result<Product, StoreError> {
        (**self).apply_delta(code, delta)
    }
}

impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    fn find_by_customer_and_code(
        &self,
        customer_id: CustomerId,
        code: &ProductCode,
    ) -> Result<Option<CartItem>, StoreError> {
        (**self).find_by_customer_and_code(customer_id, code)
    }

    fn find_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        (**self).find_by_id(id)
    }

    fn find_all_by_customer(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, StoreError> {
        (**self).find_all_by_customer(customer_id)
    }

    fn create(&self, fields: NewCartItem) -> Result<CartItem, StoreError> {
        (**self).create(fields)
    }

    fn update_quantity(
        &self,
        id: CartItemId,
        quantity: u32,
        expected_version: ExpectedVersion,
    ) -> Result<CartItem, StoreError> {
        (**self).update_quantity(id, quantity, expected_version)
    }

    fn delete_by_id(&self, id: CartItemId) -> Result<CartItem, StoreError> {
        (**self).delete_by_id(id)
    }

    fn delete_all_by_customer(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, StoreError> {
        (**self).delete_all_by_customer(customer_id)
    }

    fn reinstate(&self, item: CartItem) -> Result<(), StoreError> {
        (**self).reinstate(item)
    }
}
