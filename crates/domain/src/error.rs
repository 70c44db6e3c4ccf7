//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::money::Money;
use crate::order::{OrderState, PaymentState};

/// Errors raised by the order aggregate.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order must contain at least one line.
    #[error("Order has no lines")]
    EmptyOrder,

    /// Line quantity must be greater than zero.
    #[error("Invalid quantity for product {product_id}: must be greater than zero")]
    InvalidQuantity { product_id: ProductId },

    /// Line unit price must be positive.
    #[error("Invalid unit price for product {product_id}: {price}")]
    InvalidPrice { product_id: ProductId, price: Money },

    /// The requested payment transition is not legal from the current state.
    #[error("Cannot {action}: payment state is {current}")]
    InvalidPaymentTransition {
        current: PaymentState,
        action: &'static str,
    },

    /// The requested order transition is not legal from the current state.
    #[error("Cannot {action}: order state is {current}")]
    InvalidStateTransition {
        current: OrderState,
        action: &'static str,
    },

    /// Stored totals no longer satisfy total = subtotal + tax + shipping.
    ///
    /// This indicates corruption and must be surfaced for manual
    /// reconciliation, never silently repaired.
    #[error("Order totals mismatch: recorded {recorded}, computed {computed}")]
    TotalsMismatch { recorded: Money, computed: Money },
}
