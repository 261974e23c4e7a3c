use serde::{Deserialize, Serialize};

use cartstock_core::{DomainError, DomainResult, Entity, Money, ProductCode, ValueObject, VendorId};

/// Per-unit pricing for a catalog product.
///
/// `discount_price` is the amount taken off `price` per unit, so the effective
/// unit price is `price - discount_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub price: Money,
    pub discount_price: Money,
    pub discount_note: Option<String>,
}

impl ValueObject for Pricing {}

impl Pricing {
    pub fn validate(&self) -> DomainResult<()> {
        if self.price == Money::ZERO {
            return Err(DomainError::validation("price must be greater than zero"));
        }
        if self.discount_price > self.price {
            return Err(DomainError::validation("discount cannot exceed price"));
        }
        Ok(())
    }

    /// Effective price of one unit after the discount.
    pub fn unit_price(&self) -> Money {
        // validate() guarantees discount_price <= price
        self.price.checked_sub(self.discount_price).unwrap_or(Money::ZERO)
    }
}

/// Input for registering a product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: ProductCode,
    pub vendor_id: VendorId,
    pub title: String,
    pub category: String,
    pub pic_url: Option<String>,
    pub pricing: Pricing,
    pub available_quantity: u32,
}

/// Catalog product: the single source of truth for sellable stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    code: ProductCode,
    vendor_id: VendorId,
    title: String,
    category: String,
    pic_url: Option<String>,
    pricing: Pricing,
    available_quantity: u32,
    version: u64,
}

impl Product {
    pub fn new(input: NewProduct) -> DomainResult<Self> {
        if input.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if input.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        input.pricing.validate()?;

        Ok(Self {
            code: input.code,
            vendor_id: input.vendor_id,
            title: input.title,
            category: input.category,
            pic_url: input.pic_url,
            pricing: input.pricing,
            available_quantity: input.available_quantity,
            version: 0,
        })
    }

    pub fn code(&self) -> &ProductCode {
        &self.code
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn title(&self) -> &str {
        &self.title
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

    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    /// Stock level that would result from applying `delta`, without mutating.
    ///
    /// Negative deltas reserve stock and fail with `OutOfStock` when the product
    /// cannot cover them. Positive deltas release stock.
    pub fn quantity_after(&self, delta: i64) -> DomainResult<u32> {
        let next = i64::from(self.available_quantity) + delta;
        if next < 0 {
            let requested = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
            return Err(DomainError::out_of_stock(
                self.code.as_str(),
                requested,
                self.available_quantity,
            ));
        }
        u32::try_from(next)
            .map_err(|_| DomainError::invariant("available quantity exceeds u32 range"))
    }

    /// Apply a signed stock delta. Leaves the product untouched on error.
    pub fn apply_delta(&mut self, delta: i64) -> DomainResult<()> {
        let next = self.quantity_after(delta)?;
        self.available_quantity = next;
        self.version += 1;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }

    fn version(&self) -> u64 {
        self.version
    }
}
