use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartstock_catalog::{Pricing, Product};
use cartstock_core::{CartItemId, CustomerId, DomainError, DomainResult, Entity, Money, ProductCode};

/// Fields for a cart line that has not been stored yet.
///
/// Pricing and display fields are a snapshot of the catalog product taken at
/// add-time; they are not re-derived later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub customer_id: CustomerId,
    pub product_code: ProductCode,
    pub product_name: String,
    pub category: String,
    pub pic_url: Option<String>,
    pub pricing: Pricing,
    pub quantity: u32,
}

impl NewCartItem {
    /// Snapshot a catalog product into a new cart line of `quantity` units.
    pub fn snapshot(customer_id: CustomerId, product: &Product, quantity: u32) -> DomainResult<Self> {
        ensure_quantity(quantity)?;
        Ok(Self {
            customer_id,
            product_code: product.code().clone(),
            product_name: product.title().to_string(),
            category: product.category().to_string(),
            pic_url: product.pic_url().map(str::to_string),
            pricing: product.pricing().clone(),
            quantity,
        })
    }
}

/// An active cart line: `quantity` units of one product reserved for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    id: CartItemId,
    customer_id: CustomerId,
    product_code: ProductCode,
    product_name: String,
    category: String,
    pic_url: Option<String>,
    pricing: Pricing,
    quantity: u32,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Materialize a stored line from its creation fields.
    pub fn create(id: CartItemId, fields: NewCartItem, at: DateTime<Utc>) -> DomainResult<Self> {
        ensure_quantity(fields.quantity)?;
        Ok(Self {
            id,
            customer_id: fields.customer_id,
            product_code: fields.product_code,
            product_name: fields.product_name,
            category: fields.category,
            pic_url: fields.pic_url,
            pricing: fields.pricing,
            quantity: fields.quantity,
            version: 1,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn id_typed(&self) -> CartItemId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn product_code(&self) -> &ProductCode {
        &self.product_code
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn pic_url(&self) -> Option<&str> {
        self.pic_url.as_deref()
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Signed stock delta needed to move this line to `new_quantity`.
    ///
    /// Positive means more units must be reserved from the product.
    pub fn reservation_delta(&self, new_quantity: u32) -> i64 {
        i64::from(new_quantity) - i64::from(self.quantity)
    }

    pub fn set_quantity(&mut self, quantity: u32, at: DateTime<Utc>) -> DomainResult<()> {
        ensure_quantity(quantity)?;
        self.quantity = quantity;
        self.version += 1;
        self.updated_at = at;
        Ok(())
    }

    /// `(price - discount) * quantity` using the add-time snapshot.
    pub fn line_total(&self) -> DomainResult<Money> {
        self.pricing
            .unit_price()
            .checked_mul(self.quantity)
            .ok_or_else(|| DomainError::invariant("line total overflow"))
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Sum of line totals over a customer's cart.
pub fn compute_total(items: &[CartItem]) -> DomainResult<Money> {
    items.iter().try_fold(Money::ZERO, |acc, item| {
        acc.checked_add(item.line_total()?)
            .ok_or_else(|| DomainError::invariant("cart total overflow"))
    })
}

fn ensure_quantity(quantity: u32) -> DomainResult<()> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be at least 1"));
    }
    Ok(())
}
