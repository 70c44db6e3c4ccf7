//! Checkout and reconciliation error types.

use common::{AddressId, ProductId};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the payment gateway adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The webhook signature did not verify.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// The signed payload could not be decoded as an event.
    #[error("Malformed webhook payload: {0}")]
    MalformedEvent(String),

    /// The gateway refused or failed to create a payment intent.
    #[error("Payment intent creation failed: {0}")]
    IntentCreation(String),
}

/// Errors returned by the checkout orchestrator.
///
/// The first four are validation or contention outcomes: no side effects
/// remain when they are returned. `PaymentGateway` and `Store` are returned
/// only after full compensation of this call's reservations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart was empty.
    #[error("Cart is empty")]
    EmptyCart,

    /// The address does not exist or belongs to another customer.
    #[error("Invalid address: {address_id}")]
    InvalidAddress { address_id: AddressId },

    /// The product does not exist or is not active.
    #[error("Product not available: {product_id}")]
    ProductUnavailable { product_id: ProductId },

    /// Not enough stock for the requested quantity. Expected under
    /// contention; all partial reservations have been rolled back.
    #[error("Insufficient stock for product: {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Gateway intent creation failed or timed out; the order was cancelled
    /// and all reservations released. The customer may retry.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// Order validation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Storage failure; checkout fails closed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by the webhook reconciler.
///
/// The two variants map to the two delivery fates: `Rejected` must not be
/// retried as-is (the request itself is bad), `Retry` asks the provider to
/// redeliver (our storage hiccuped, the event is fine).
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification or payload decoding failed. Non-retryable.
    #[error("Webhook rejected: {0}")]
    Rejected(String),

    /// Transient storage failure after signature verification. Retryable.
    #[error("Webhook processing failed, redelivery requested: {0}")]
    Retry(#[from] StoreError),
}
