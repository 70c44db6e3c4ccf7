//! Checkout orchestration and webhook payment reconciliation.
//!
//! The two write paths of the storefront core live here:
//!
//! - [`CheckoutOrchestrator`] turns a cart into an order: reserve stock,
//!   snapshot prices, persist the order, create the gateway intent, with
//!   full compensation (stock release, order cancellation) on any failure
//!   past the first reservation.
//! - [`WebhookReconciler`] consumes signed gateway events and applies
//!   idempotent, conditional state transitions to orders, releasing stock
//!   when payment ultimately fails.

pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod reconciler;
pub mod signature;

pub use error::{CheckoutError, GatewayError, WebhookError};
pub use gateway::{
    CreateIntent, InMemoryGateway, PaymentGateway, PaymentIntent, WebhookEvent, WebhookEventKind,
};
pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt};
pub use reconciler::{Ack, WebhookReconciler};
