//! Checkout orchestration: cart to order to payment intent, as one logical
//! unit with full compensation on failure.

use std::time::Duration;

use chrono::Utc;

use common::{AddressId, CustomerId, OrderId, ProductId};
use domain::{CartLine, Order, OrderError, OrderLine, OrderNumber, Pricing};
use store::{
    AddressStore, InventoryStore, OrderStore, ReserveOutcome, StoreError, TransitionOutcome,
};

use crate::error::CheckoutError;
use crate::gateway::{CreateIntent, PaymentGateway};

/// What the caller gets back from a successful checkout: enough to show a
/// confirmation and hand the client secret to the payment form. No card data
/// ever flows through this service.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub client_secret: String,
}

/// Drives the checkout sequence: validate, reserve, price, persist, charge.
///
/// Each step is a hard precondition for the next. Any failure after the
/// first reservation rolls back every reservation made by this call before
/// returning, so no partial reservation is ever left outstanding. The order
/// row is always persisted before the gateway intent is requested; the
/// reverse ordering would risk an orphaned provider-side intent.
pub struct CheckoutOrchestrator<S, G> {
    store: S,
    gateway: G,
    pricing: Pricing,
    currency: String,
    gateway_timeout: Duration,
}

impl<S, G> CheckoutOrchestrator<S, G>
where
    S: InventoryStore + AddressStore + OrderStore,
    G: PaymentGateway,
{
    /// Creates an orchestrator with default pricing, USD, and a 10s gateway
    /// timeout.
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            pricing: Pricing::default(),
            currency: "USD".to_string(),
            gateway_timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the pricing policy.
    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Overrides the charge currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Overrides the gateway call timeout. A timeout is treated exactly like
    /// an explicit gateway error: full compensation, retryable result.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Runs a checkout for an authenticated customer.
    #[tracing::instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn checkout(
        &self,
        customer_id: CustomerId,
        address_id: AddressId,
        cart: Vec<CartLine>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        // 1. Validation, before any side effect.
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        for line in &cart {
            if line.quantity == 0 {
                return Err(CheckoutError::Order(OrderError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                }));
            }
        }

        // 2. Address must exist and belong to this customer.
        let address = self
            .store
            .get_address(address_id)
            .await?
            .filter(|a| a.belongs_to(customer_id))
            .ok_or(CheckoutError::InvalidAddress { address_id })?;

        // 3. Reserve line by line; price is snapshotted at the same instant.
        let mut reserved: Vec<(ProductId, u32)> = Vec::new();
        let mut lines: Vec<OrderLine> = Vec::with_capacity(cart.len());

        for cart_line in &cart {
            let product = match self.store.get_product(&cart_line.product_id).await {
                Ok(Some(p)) if p.active => p,
                Ok(_) => {
                    self.release_reserved(&reserved).await;
                    return Err(CheckoutError::ProductUnavailable {
                        product_id: cart_line.product_id.clone(),
                    });
                }
                Err(e) => {
                    self.release_reserved(&reserved).await;
                    return Err(e.into());
                }
            };

            match self
                .store
                .reserve(&cart_line.product_id, cart_line.quantity)
                .await
            {
                Ok(ReserveOutcome::Reserved) => {
                    reserved.push((cart_line.product_id.clone(), cart_line.quantity));
                    lines.push(OrderLine::new(
                        cart_line.product_id.clone(),
                        cart_line.quantity,
                        product.current_price(),
                    ));
                }
                Ok(ReserveOutcome::Insufficient) => {
                    self.release_reserved(&reserved).await;
                    metrics::counter!("checkout_insufficient_stock_total").increment(1);
                    tracing::debug!(product_id = %cart_line.product_id, "insufficient stock");
                    return Err(CheckoutError::InsufficientStock {
                        product_id: cart_line.product_id.clone(),
                    });
                }
                Err(e) => {
                    self.release_reserved(&reserved).await;
                    return Err(e.into());
                }
            }
        }

        // 4./5. Place the order with frozen totals and persist it, before
        // any gateway interaction.
        let order = match Order::place(
            OrderId::new(),
            customer_id,
            address.id,
            lines,
            &self.pricing,
            Utc::now(),
        ) {
            Ok(order) => order,
            Err(e) => {
                self.release_reserved(&reserved).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.insert_order(&order).await {
            self.release_reserved(&reserved).await;
            return Err(e.into());
        }

        // 6. Gateway intent, under a timeout. A hung call and an explicit
        // error take the same compensation path.
        let req = CreateIntent {
            amount_minor: order.total().minor_units(),
            currency: self.currency.clone(),
            order_id: order.id(),
            customer_id,
        };

        let intent = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_intent(req),
        )
        .await
        {
            Ok(Ok(intent)) => intent,
            Ok(Err(e)) => {
                self.compensate(order.id(), &reserved, "gateway error").await;
                return Err(CheckoutError::PaymentGateway(e.to_string()));
            }
            Err(_) => {
                self.compensate(order.id(), &reserved, "gateway timeout").await;
                return Err(CheckoutError::PaymentGateway(
                    "payment gateway timed out".to_string(),
                ));
            }
        };

        // 7. Persist the intent: Pending → Processing.
        match self.store.attach_intent(order.id(), &intent.intent_id).await {
            Ok(TransitionOutcome::Applied) => {}
            Ok(TransitionOutcome::NotApplied) => {
                self.compensate(order.id(), &reserved, "unexpected order state")
                    .await;
                return Err(CheckoutError::Store(StoreError::Corrupt(format!(
                    "order {} left pending state during checkout",
                    order.id()
                ))));
            }
            Err(e) => {
                self.compensate(order.id(), &reserved, "intent persistence failure")
                    .await;
                return Err(e.into());
            }
        }

        metrics::counter!("checkout_completed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id(),
            order_number = %order.number(),
            total = %order.total(),
            "checkout completed"
        );

        Ok(CheckoutReceipt {
            order_id: order.id(),
            order_number: order.number().clone(),
            client_secret: intent.client_secret,
        })
    }

    /// Rolls back all reservations made by the current call. Release
    /// failures are logged and skipped: the remaining lines still get
    /// released.
    async fn release_reserved(&self, reserved: &[(ProductId, u32)]) {
        for (product_id, quantity) in reserved {
            if let Err(e) = self.store.release(product_id, *quantity).await {
                tracing::error!(
                    %product_id,
                    quantity,
                    error = %e,
                    "failed to release reservation during checkout rollback"
                );
            }
        }
    }

    /// Compensation once the order row exists: release every reservation and
    /// cancel the order, leaving no ambiguous partial state for the customer.
    async fn compensate(&self, order_id: OrderId, reserved: &[(ProductId, u32)], reason: &str) {
        tracing::warn!(%order_id, reason, "compensating checkout");
        self.release_reserved(reserved).await;

        if let Err(e) = self.store.cancel_unpaid(order_id).await {
            tracing::error!(%order_id, error = %e, "failed to cancel order during compensation");
        }

        metrics::counter!("checkout_compensations_total").increment(1);
    }
}
