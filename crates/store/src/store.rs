use async_trait::async_trait;

use common::{AddressId, IntentId, OrderId, ProductId};
use domain::{Address, Order, Product};

use crate::Result;

/// Outcome of a conditional stock reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was decremented.
    Reserved,
    /// Available quantity was lower than requested; nothing changed.
    Insufficient,
}

/// Outcome of a conditional state transition.
///
/// `NotApplied` is not an error: under concurrent deliveries exactly one
/// caller wins the update and every loser observes `NotApplied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The row matched the precondition and was updated.
    Applied,
    /// The precondition did not hold (already transitioned, or unknown key).
    NotApplied,
}

/// Per-product stock ledger.
///
/// `reserve` must check-and-decrement in one atomic step; it is the only
/// write path that lowers `available`, which is how the non-negative
/// invariant holds under arbitrary concurrent callers.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Loads a product record.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Atomically reserves `quantity` units if available.
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<ReserveOutcome>;

    /// Atomically returns `quantity` units to stock.
    ///
    /// Compensation only. Idempotence per logical reservation is the
    /// caller's responsibility (the reconciler's terminal-state guard).
    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Returns the currently available quantity, or None for an unknown product.
    async fn available(&self, product_id: &ProductId) -> Result<Option<u32>>;
}

/// Customer address lookup.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Loads an address record.
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>>;
}

/// Order persistence.
///
/// After `insert_order`, the only mutations this trait permits are the
/// payment-state transitions, each a single conditional update keyed on
/// the pre-transition state. Lines and totals are structurally immutable.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order with its lines atomically.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by ID.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads an order by its payment intent (the webhook correlation key).
    async fn find_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>>;

    /// Records the gateway intent: `Pending → Processing`, intent attached.
    /// Applies only if the order is still awaiting an intent.
    async fn attach_intent(
        &self,
        order_id: OrderId,
        intent_id: &IntentId,
    ) -> Result<TransitionOutcome>;

    /// Settles payment: `Processing → Paid`, `Created → Confirmed`.
    /// Applies only if the order is still `Processing`.
    async fn apply_payment_success(&self, intent_id: &IntentId) -> Result<TransitionOutcome>;

    /// Fails payment: `Pending/Processing → Failed`, order → `Cancelled`.
    async fn apply_payment_failure(&self, intent_id: &IntentId) -> Result<TransitionOutcome>;

    /// Checkout compensation: cancels an order that never reached the
    /// gateway (or whose intent creation failed), by order ID.
    async fn cancel_unpaid(&self, order_id: OrderId) -> Result<TransitionOutcome>;
}

/// Convenience bound for a backend implementing all three store facets.
pub trait StorefrontStore: InventoryStore + AddressStore + OrderStore {}

// Blanket implementation for any full backend
impl<T: InventoryStore + AddressStore + OrderStore> StorefrontStore for T {}
