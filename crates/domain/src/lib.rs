//! Domain layer for the storefront checkout core.
//!
//! This crate provides the building blocks the orchestrator and reconciler
//! operate on:
//! - `Money` fixed-point currency and the `Pricing` policy
//! - catalog records (`Product`, `Address`) consumed read-only at checkout
//! - the `Order` aggregate with its two state machines
//!   (`OrderState`, `PaymentState`)

pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;

pub use catalog::{Address, Product};
pub use error::OrderError;
pub use money::Money;
pub use order::{
    CartLine, Order, OrderLine, OrderNumber, OrderState, OrderTotals, PaymentState,
};
pub use pricing::Pricing;
