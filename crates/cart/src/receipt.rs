use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartstock_core::{CustomerId, DomainError, DomainResult, Money, ProductCode};

use crate::item::{CartItem, compute_total};

/// One consumed cart line on a checkout receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub product_code: ProductCode,
    pub product_name: String,
    pub quantity: u32,
    pub line_total: Money,
}

/// Result of finalizing a cart: the reservations it consumed and what they cost.
///
/// An order layer can persist this; the receipt itself holds no order identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub customer_id: CustomerId,
    pub lines: Vec<ReceiptLine>,
    pub total: Money,
    pub checked_out_at: DateTime<Utc>,
}

impl CheckoutReceipt {
    pub fn from_items(
        customer_id: CustomerId,
        items: &[CartItem],
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("cannot check out an empty cart"));
        }
        if let Some(foreign) = items.iter().find(|i| i.customer_id() != customer_id) {
            return Err(DomainError::invariant(format!(
                "cart item {} belongs to another customer",
                foreign.id_typed()
            )));
        }

        let lines = items
            .iter()
            .map(|item| {
                Ok(ReceiptLine {
                    product_code: item.product_code().clone(),
                    product_name: item.product_name().to_string(),
                    quantity: item.quantity(),
                    line_total: item.line_total()?,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            customer_id,
            lines,
            total: compute_total(items)?,
            checked_out_at: at,
        })
    }

    /// Human-readable product summary, e.g. `"Soap : 2, Oil : 1"`.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{} : {}", l.product_name, l.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn units(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}
