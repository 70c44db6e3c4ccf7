//! Order line items and the incoming cart shape.

use serde::{Deserialize, Serialize};

use common::ProductId;

use crate::money::Money;

/// A line as submitted by the client: what and how many, no prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a cart line.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A line item as frozen into an order.
///
/// `unit_price` is the price snapshot taken at checkout; it is never re-read
/// from the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates an order line with a price snapshot.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the line subtotal (quantity * unit_price).
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
