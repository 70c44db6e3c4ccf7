//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{AddressId, CustomerId, IntentId, OrderId};

use crate::error::OrderError;
use crate::money::Money;
use crate::pricing::Pricing;

use super::{OrderLine, OrderNumber, OrderState, PaymentState};

/// Totals computed once when the order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computes totals for a set of lines under a pricing policy.
    pub fn compute(lines: &[OrderLine], pricing: &Pricing) -> Self {
        let subtotal: Money = lines.iter().map(OrderLine::line_subtotal).sum();
        let tax = pricing.tax(subtotal);
        let shipping_cost = pricing.shipping(subtotal);
        Self {
            subtotal,
            tax,
            shipping_cost,
            total: subtotal + tax + shipping_cost,
        }
    }
}

/// Order aggregate root.
///
/// Created whole by the checkout orchestrator; after creation only the state
/// pair (and `updated_at`) ever changes. Lines and totals are frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    number: OrderNumber,
    customer_id: CustomerId,
    address_id: AddressId,
    lines: Vec<OrderLine>,
    totals: OrderTotals,
    state: OrderState,
    payment_state: PaymentState,
    payment_intent_id: Option<IntentId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order: validates lines, computes totals, starts the
    /// lifecycle at `Created`/`Pending`.
    pub fn place(
        id: OrderId,
        customer_id: CustomerId,
        address_id: AddressId,
        lines: Vec<OrderLine>,
        pricing: &Pricing,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for line in &lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                });
            }
            if !line.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    product_id: line.product_id.clone(),
                    price: line.unit_price,
                });
            }
        }

        let totals = OrderTotals::compute(&lines, pricing);

        Ok(Self {
            id,
            number: OrderNumber::derive(id, placed_at),
            customer_id,
            address_id,
            lines,
            totals,
            state: OrderState::Created,
            payment_state: PaymentState::Pending,
            payment_intent_id: None,
            created_at: placed_at,
            updated_at: placed_at,
        })
    }

    /// Rehydrates an order from storage without re-validating.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: OrderId,
        number: OrderNumber,
        customer_id: CustomerId,
        address_id: AddressId,
        lines: Vec<OrderLine>,
        totals: OrderTotals,
        state: OrderState,
        payment_state: PaymentState,
        payment_intent_id: Option<IntentId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            number,
            customer_id,
            address_id,
            lines,
            totals,
            state,
            payment_state,
            payment_intent_id,
            created_at,
            updated_at,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn number(&self) -> &OrderNumber {
        &self.number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn address_id(&self) -> AddressId {
        self.address_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn subtotal(&self) -> Money {
        self.totals.subtotal
    }

    pub fn tax(&self) -> Money {
        self.totals.tax
    }

    pub fn shipping_cost(&self) -> Money {
        self.totals.shipping_cost
    }

    pub fn total(&self) -> Money {
        self.totals.total
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn payment_state(&self) -> PaymentState {
        self.payment_state
    }

    pub fn payment_intent_id(&self) -> Option<&IntentId> {
        self.payment_intent_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Checks the frozen-totals invariant: total = subtotal + tax + shipping.
    pub fn verify_totals(&self) -> Result<(), OrderError> {
        let computed = self.totals.subtotal + self.totals.tax + self.totals.shipping_cost;
        if computed != self.totals.total {
            return Err(OrderError::TotalsMismatch {
                recorded: self.totals.total,
                computed,
            });
        }
        Ok(())
    }
}

// Command methods. Each one is a guarded transition: the state check and the
// mutation form one step, so a caller holding exclusive access to the order
// (a store write lock, or a SQL conditional update) gets compare-and-swap
// semantics for free.
impl Order {
    /// Attaches the gateway intent and moves payment to `Processing`.
    pub fn attach_intent(&mut self, intent_id: IntentId, at: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.payment_state.can_start_processing() {
            return Err(OrderError::InvalidPaymentTransition {
                current: self.payment_state,
                action: "attach payment intent",
            });
        }
        self.payment_intent_id = Some(intent_id);
        self.payment_state = PaymentState::Processing;
        self.updated_at = at;
        Ok(())
    }

    /// Settles payment: `Processing → Paid`, `Created → Confirmed`.
    pub fn settle_paid(&mut self, at: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.payment_state.can_settle() {
            return Err(OrderError::InvalidPaymentTransition {
                current: self.payment_state,
                action: "settle payment",
            });
        }
        if !self.state.can_confirm() {
            return Err(OrderError::InvalidStateTransition {
                current: self.state,
                action: "confirm order",
            });
        }
        self.payment_state = PaymentState::Paid;
        self.state = OrderState::Confirmed;
        self.updated_at = at;
        Ok(())
    }

    /// Fails payment: `Pending/Processing → Failed`, order → `Cancelled`.
    pub fn settle_failed(&mut self, at: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.payment_state.can_fail() {
            return Err(OrderError::InvalidPaymentTransition {
                current: self.payment_state,
                action: "fail payment",
            });
        }
        if !self.state.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current: self.state,
                action: "cancel order",
            });
        }
        self.payment_state = PaymentState::Failed;
        self.state = OrderState::Cancelled;
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_order(lines: Vec<OrderLine>) -> Result<Order, OrderError> {
        Order::place(
            OrderId::new(),
            CustomerId::new(),
            AddressId::new(),
            lines,
            &Pricing::default(),
            Utc::now(),
        )
    }

    fn two_line_order() -> Order {
        place_order(vec![
            OrderLine::new("SKU-001", 2, Money::from_cents(1000)),
            OrderLine::new("SKU-002", 1, Money::from_cents(2500)),
        ])
        .unwrap()
    }

    #[test]
    fn test_place_computes_totals() {
        let order = two_line_order();

        // subtotal 4500, tax 21% = 945, shipping flat 499 (below threshold)
        assert_eq!(order.subtotal().cents(), 4500);
        assert_eq!(order.tax().cents(), 945);
        assert_eq!(order.shipping_cost().cents(), 499);
        assert_eq!(order.total().cents(), 4500 + 945 + 499);
        assert!(order.verify_totals().is_ok());
    }

    #[test]
    fn test_place_free_shipping_above_threshold() {
        let order = place_order(vec![OrderLine::new("SKU-001", 3, Money::from_cents(2000))]).unwrap();
        assert_eq!(order.subtotal().cents(), 6000);
        assert_eq!(order.shipping_cost().cents(), 0);
    }

    #[test]
    fn test_place_starts_created_pending() {
        let order = two_line_order();
        assert_eq!(order.state(), OrderState::Created);
        assert_eq!(order.payment_state(), PaymentState::Pending);
        assert!(order.payment_intent_id().is_none());
        assert!(order.number().as_str().starts_with("ORD-"));
    }

    #[test]
    fn test_place_empty_order_fails() {
        assert!(matches!(place_order(vec![]), Err(OrderError::EmptyOrder)));
    }

    #[test]
    fn test_place_zero_quantity_fails() {
        let result = place_order(vec![OrderLine::new("SKU-001", 0, Money::from_cents(1000))]);
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_place_zero_price_fails() {
        let result = place_order(vec![OrderLine::new("SKU-001", 1, Money::zero())]);
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn test_attach_intent() {
        let mut order = two_line_order();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();

        assert_eq!(order.payment_state(), PaymentState::Processing);
        assert_eq!(order.payment_intent_id().unwrap().as_str(), "pi_001");
    }

    #[test]
    fn test_attach_intent_twice_fails() {
        let mut order = two_line_order();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();

        let result = order.attach_intent(IntentId::new("pi_002"), Utc::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidPaymentTransition { .. })
        ));
        assert_eq!(order.payment_intent_id().unwrap().as_str(), "pi_001");
    }

    #[test]
    fn test_settle_paid_confirms_order() {
        let mut order = two_line_order();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();
        order.settle_paid(Utc::now()).unwrap();

        assert_eq!(order.payment_state(), PaymentState::Paid);
        assert_eq!(order.state(), OrderState::Confirmed);
    }

    #[test]
    fn test_settle_paid_requires_processing() {
        let mut order = two_line_order();
        let result = order.settle_paid(Utc::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidPaymentTransition { .. })
        ));
    }

    #[test]
    fn test_settle_paid_is_not_repeatable() {
        let mut order = two_line_order();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();
        order.settle_paid(Utc::now()).unwrap();

        assert!(order.settle_paid(Utc::now()).is_err());
        assert_eq!(order.payment_state(), PaymentState::Paid);
    }

    #[test]
    fn test_settle_failed_cancels_order() {
        let mut order = two_line_order();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();
        order.settle_failed(Utc::now()).unwrap();

        assert_eq!(order.payment_state(), PaymentState::Failed);
        assert_eq!(order.state(), OrderState::Cancelled);
    }

    #[test]
    fn test_settle_failed_allowed_before_intent() {
        // Checkout compensation path: gateway call failed, no intent attached.
        let mut order = two_line_order();
        order.settle_failed(Utc::now()).unwrap();
        assert_eq!(order.payment_state(), PaymentState::Failed);
        assert_eq!(order.state(), OrderState::Cancelled);
    }

    #[test]
    fn test_paid_is_monotonic() {
        let mut order = two_line_order();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();
        order.settle_paid(Utc::now()).unwrap();

        // A late payment_failed redelivery must not undo Paid.
        assert!(order.settle_failed(Utc::now()).is_err());
        assert_eq!(order.payment_state(), PaymentState::Paid);
        assert_eq!(order.state(), OrderState::Confirmed);
    }

    #[test]
    fn test_totals_never_recomputed_after_settlement() {
        let mut order = two_line_order();
        let before = order.totals();
        order
            .attach_intent(IntentId::new("pi_001"), Utc::now())
            .unwrap();
        order.settle_paid(Utc::now()).unwrap();
        assert_eq!(order.totals(), before);
    }

    #[test]
    fn test_verify_totals_detects_corruption() {
        let order = two_line_order();
        let mut corrupted = Order::from_stored(
            order.id(),
            order.number().clone(),
            order.customer_id(),
            order.address_id(),
            order.lines().to_vec(),
            OrderTotals {
                total: order.total() + Money::from_cents(1),
                ..order.totals()
            },
            order.state(),
            order.payment_state(),
            None,
            order.created_at(),
            order.updated_at(),
        );
        assert!(matches!(
            corrupted.verify_totals(),
            Err(OrderError::TotalsMismatch { .. })
        ));
        // And the aggregate never "fixes" it.
        let _ = corrupted.attach_intent(IntentId::new("pi_x"), Utc::now());
        assert!(corrupted.verify_totals().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = two_line_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), order.id());
        assert_eq!(back.total(), order.total());
        assert_eq!(back.lines().len(), 2);
    }
}
