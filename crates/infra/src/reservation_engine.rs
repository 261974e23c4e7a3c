//! Inventory reservation engine (cart ↔ catalog reconciliation).
//!
//! Every cart mutation that changes how many units a customer holds is a
//! **paired update**: a signed stock delta on the product plus the matching
//! cart write. The engine applies the stock side first through the catalog's
//! atomic `apply_delta` and commits the cart side only on success.
//!
//! ```text
//! cart request
//!   ↓
//! 1. Validate + read current cart line / product
//!   ↓
//! 2. CatalogStore::apply_delta   (atomic check-and-set on stock)
//!   ↓
//! 3. CartStore write             (guarded by pair uniqueness / line version)
//!   ↓  on failure
//! 4. Compensate step 2, return the step 3 error
//! ```
//!
//! Release-style operations delete the cart side first so a line can only be
//! released once, then return its units to stock.
//!
//! ## Invariants
//!
//! - `available_quantity` never goes negative.
//! - For every product: initial stock == available + sum of active line quantities
//!   (checked-out lines excepted, they are consumed).

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use cartstock_cart::{CartItem, CheckoutReceipt, NewCartItem, compute_total};
use cartstock_core::{
    CartItemId, CustomerId, DomainError, Entity, ExpectedVersion, Money, ProductCode,
};

use crate::config::EngineConfig;
use crate::store::{CartStore, CatalogStore, StoreError};

/// Error returned by reservation engine operations.
///
/// `NotFound`, `Conflict`, `OutOfStock` and `Validation` are business outcomes
/// and are never retried. `Unavailable` is a store fault; `Internal` means a
/// compensation step failed and stock accounting needs attention.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("product {product_code} out of stock (requested {requested}, available {available})")]
    OutOfStock {
        product_code: String,
        requested: u32,
        available: u32,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReservationError {
    /// True for business-rule outcomes, false for store or compensation faults.
    pub fn is_business(&self) -> bool {
        !matches!(self, Self::Unavailable(_) | Self::Internal(_))
    }
}

impl From<DomainError> for ReservationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::InvariantViolation(msg) => Self::Internal(msg),
            DomainError::NotFound(what) => Self::NotFound(what),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::OutOfStock {
                product_code,
                requested,
                available,
            } => Self::OutOfStock {
                product_code,
                requested,
                available,
            },
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, key } => Self::NotFound(format!("{entity} {key}")),
            StoreError::Duplicate(msg) => Self::Conflict(msg),
            StoreError::Concurrency(msg) => Self::Conflict(msg),
            StoreError::Insufficient {
                product_code,
                requested,
                available,
            } => Self::OutOfStock {
                product_code,
                requested,
                available,
            },
            StoreError::Invalid(msg) => Self::Internal(msg),
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

/// Reconciles cart lines with catalog stock.
///
/// Generic over its stores so tests run against in-memory backends and
/// deployments plug in real ones. The engine holds no state of its own and is
/// safe to share across threads behind an `Arc`.
#[derive(Debug)]
pub struct ReservationEngine<C, K> {
    catalog: C,
    carts: K,
    config: EngineConfig,
}

impl<C, K> ReservationEngine<C, K> {
    pub fn new(catalog: C, carts: K) -> Self {
        Self::with_config(catalog, carts, EngineConfig::default())
    }

    pub fn with_config(catalog: C, carts: K, config: EngineConfig) -> Self {
        Self {
            catalog,
            carts,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn carts(&self) -> &K {
        &self.carts
    }
}

impl<C, K> ReservationEngine<C, K>
where
    C: CatalogStore,
    K: CartStore,
{
    /// Reserve stock for a new cart line and create the line.
    ///
    /// The number of units reserved follows the configured add policy.
    #[instrument(skip(self), err)]
    pub fn reserve_for_add(
        &self,
        customer_id: CustomerId,
        product_code: &ProductCode,
        requested_quantity: u32,
    ) -> Result<CartItem, ReservationError> {
        if requested_quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1").into());
        }
        // Bounds apply to what is actually reserved, not to the raw request.
        let quantity = self.config.add_quantity_policy.resolve(requested_quantity);
        self.config.check_line_quantity(quantity)?;

        if self
            .carts
            .find_by_customer_and_code(customer_id, product_code)?
            .is_some()
        {
            return Err(ReservationError::Conflict(format!(
                "product {product_code} is already in the cart; update the line instead"
            )));
        }

        let product = self
            .catalog
            .get_by_code(product_code)?
            .ok_or_else(|| ReservationError::NotFound(format!("product {product_code}")))?;
        let fields = NewCartItem::snapshot(customer_id, &product, quantity)?;

        let reserved = self.catalog.apply_delta(product_code, -i64::from(quantity))?;

        match self.carts.create(fields) {
            Ok(item) => {
                debug!(
                    cart_item_id = %item.id_typed(),
                    quantity,
                    available = reserved.available_quantity(),
                    "stock reserved for new cart line"
                );
                Ok(item)
            }
            Err(e) => {
                warn!(error = %e, "cart line create failed; returning reserved stock");
                self.compensate(product_code, i64::from(quantity))?;
                Err(e.into())
            }
        }
    }

    /// Move a cart line to `new_quantity`, reserving or releasing the difference.
    #[instrument(skip(self), err)]
    pub fn adjust_quantity(
        &self,
        cart_item_id: CartItemId,
        new_quantity: u32,
    ) -> Result<CartItem, ReservationError> {
        self.config.check_line_quantity(new_quantity)?;

        let item = self
            .carts
            .find_by_id(cart_item_id)?
            .ok_or_else(|| ReservationError::NotFound(format!("cart item {cart_item_id}")))?;
        let code = item.product_code().clone();

        if self.catalog.get_by_code(&code)?.is_none() {
            return Err(ReservationError::NotFound(format!("product {code}")));
        }

        let delta = item.reservation_delta(new_quantity);
        if delta == 0 {
            return Ok(item);
        }

        // Reserving more units is a negative stock delta.
        self.catalog.apply_delta(&code, -delta)?;

        match self
            .carts
            .update_quantity(cart_item_id, new_quantity, ExpectedVersion::Exact(item.version()))
        {
            Ok(updated) => {
                debug!(product_code = %code, delta, "cart line quantity adjusted");
                Ok(updated)
            }
            Err(e) => {
                warn!(product_code = %code, error = %e, "cart line update failed; reverting stock delta");
                self.compensate(&code, delta)?;
                Err(e.into())
            }
        }
    }

    /// Remove a single cart line and return its units to stock.
    ///
    /// A product retired from the catalog is skipped; its units are lost.
    #[instrument(skip(self), err)]
    pub fn release(&self, cart_item_id: CartItemId) -> Result<(), ReservationError> {
        let item = self.carts.delete_by_id(cart_item_id)?;
        let code = item.product_code().clone();

        match self.catalog.apply_delta(&code, i64::from(item.quantity())) {
            Ok(_) => {
                debug!(product_code = %code, quantity = item.quantity(), "cart line released");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    product_code = %code,
                    quantity = item.quantity(),
                    "released cart line references a retired product; stock not restored"
                );
                Ok(())
            }
            Err(e) => {
                warn!(product_code = %code, error = %e, "stock restore failed; reinstating cart line");
                if let Err(reinstate_err) = self.carts.reinstate(item) {
                    error!(
                        %cart_item_id,
                        product_code = %code,
                        error = %reinstate_err,
                        "failed to reinstate cart line; reservation lost"
                    );
                    return Err(ReservationError::Internal(format!(
                        "cart item {cart_item_id} removed but stock for {code} not restored"
                    )));
                }
                Err(e.into())
            }
        }
    }

    /// Clear a customer's cart, returning every line's units to stock.
    ///
    /// Returns the number of lines released.
    #[instrument(skip(self), err)]
    pub fn release_all(&self, customer_id: CustomerId) -> Result<usize, ReservationError> {
        let removed = self.carts.delete_all_by_customer(customer_id)?;
        if removed.is_empty() {
            return Err(ReservationError::NotFound(format!("cart of customer {customer_id}")));
        }

        let mut restored = Vec::with_capacity(removed.len());
        for item in &removed {
            match self
                .catalog
                .apply_delta(item.product_code(), i64::from(item.quantity()))
            {
                Ok(_) => restored.push(item.id_typed()),
                Err(e) if e.is_not_found() => {
                    warn!(
                        product_code = %item.product_code(),
                        quantity = item.quantity(),
                        "cart line references a retired product; stock not restored"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "stock restore failed mid-clear; rolling back");
                    self.roll_back_release(&removed, &restored)?;
                    return Err(e.into());
                }
            }
        }

        info!(count = removed.len(), "cart cleared");
        Ok(removed.len())
    }

    /// Finalize a customer's cart: lines are removed and their reservations
    /// become consumed stock (nothing is returned to the catalog).
    #[instrument(skip(self), err)]
    pub fn checkout(&self, customer_id: CustomerId) -> Result<CheckoutReceipt, ReservationError> {
        let removed = self.carts.delete_all_by_customer(customer_id)?;
        if removed.is_empty() {
            return Err(ReservationError::NotFound(format!("cart of customer {customer_id}")));
        }

        match CheckoutReceipt::from_items(customer_id, &removed, Utc::now()) {
            Ok(receipt) => {
                info!(
                    lines = receipt.lines.len(),
                    units = receipt.units(),
                    total = %receipt.total,
                    "cart checked out"
                );
                Ok(receipt)
            }
            Err(e) => {
                self.roll_back_release(&removed, &[])?;
                Err(e.into())
            }
        }
    }

    /// `sum((price - discount) * quantity)` over the customer's active lines.
    pub fn compute_total(&self, customer_id: CustomerId) -> Result<Money, ReservationError> {
        let items = self.list_items(customer_id)?;
        Ok(compute_total(&items)?)
    }

    /// Active lines of a customer, oldest first.
    pub fn list_items(&self, customer_id: CustomerId) -> Result<Vec<CartItem>, ReservationError> {
        let items = self.carts.find_all_by_customer(customer_id)?;
        if items.is_empty() {
            return Err(ReservationError::NotFound(format!("cart of customer {customer_id}")));
        }
        Ok(items)
    }

    /// Undo the stock side of a paired update.
    ///
    /// A product retired in the meantime is tolerated; any other failure leaves
    /// stock and carts disagreeing and is reported as `Internal`.
    fn compensate(&self, code: &ProductCode, delta: i64) -> Result<(), ReservationError> {
        match self.catalog.apply_delta(code, delta) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!(product_code = %code, delta, "product retired before compensation");
                Ok(())
            }
            Err(e) => {
                error!(product_code = %code, delta, error = %e, "compensation failed; stock accounting is inconsistent");
                Err(ReservationError::Internal(format!(
                    "failed to apply compensating delta {delta} to {code}: {e}"
                )))
            }
        }
    }

    /// Put removed lines back after a failed clear/checkout.
    ///
    /// Each line is reinstated before its stock is touched. A line whose
    /// stock was already restored is then re-reserved; if that fails the line
    /// is removed again and stays released. A line that cannot be reinstated
    /// while still holding its reservation gets its units returned.
    fn roll_back_release(
        &self,
        removed: &[CartItem],
        restored: &[CartItemId],
    ) -> Result<(), ReservationError> {
        let mut consistent = true;

        for item in removed {
            let id = item.id_typed();
            let code = item.product_code();
            let quantity = i64::from(item.quantity());
            let stock_restored = restored.contains(&id);

            if let Err(e) = self.carts.reinstate(item.clone()) {
                if stock_restored {
                    warn!(cart_item_id = %id, product_code = %code, error = %e, "could not reinstate cart line; it stays released");
                } else {
                    error!(cart_item_id = %id, product_code = %code, error = %e, "could not reinstate cart line; returning its units");
                    if self.compensate(code, quantity).is_err() {
                        consistent = false;
                    }
                }
                continue;
            }

            if !stock_restored {
                continue;
            }

            if let Err(e) = self.catalog.apply_delta(code, -quantity) {
                warn!(cart_item_id = %id, product_code = %code, error = %e, "could not re-reserve stock; line stays released");
                if let Err(delete_err) = self.carts.delete_by_id(id) {
                    error!(
                        cart_item_id = %id,
                        product_code = %code,
                        error = %delete_err,
                        "reinstated cart line holds no reservation"
                    );
                    consistent = false;
                }
            }
        }

        if consistent {
            Ok(())
        } else {
            Err(ReservationError::Internal(
                "cart rollback incomplete; see error log".to_string(),
            ))
        }
    }
}
