//! Catalog records consumed read-only at checkout.
//!
//! Product and address CRUD lives outside this core; checkout only loads
//! these records to validate a cart and snapshot prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{AddressId, CustomerId, ProductId};

use crate::money::Money;

/// A sellable product as the checkout sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub list_price: Money,
    pub sale_price: Option<Money>,
    pub on_sale: bool,
    pub active: bool,
}

impl Product {
    /// Creates an active, non-sale product.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, list_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            list_price,
            sale_price: None,
            on_sale: false,
            active: true,
        }
    }

    /// Puts the product on sale at the given price.
    pub fn with_sale_price(mut self, sale_price: Money) -> Self {
        self.sale_price = Some(sale_price);
        self.on_sale = true;
        self
    }

    /// Marks the product inactive (not purchasable).
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// The price a buyer pays right now.
    ///
    /// Evaluated once per checkout; orders keep the snapshot, so later
    /// catalog edits never touch them.
    pub fn current_price(&self) -> Money {
        if self.on_sale
            && let Some(sale) = self.sale_price
        {
            return sale;
        }
        self.list_price
    }
}

/// A customer shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Returns true if the address belongs to the given customer.
    pub fn belongs_to(&self, customer_id: CustomerId) -> bool {
        self.customer_id == customer_id
    }
}
