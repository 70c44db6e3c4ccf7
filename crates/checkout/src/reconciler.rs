//! Webhook reconciliation: idempotent settlement of orders from gateway
//! events.

use domain::Order;
use store::{InventoryStore, OrderStore, TransitionOutcome};

use crate::error::WebhookError;
use crate::gateway::{PaymentGateway, WebhookEventKind};

/// Acknowledged outcomes of a webhook delivery. All three are success from
/// the provider's point of view and must not trigger redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The event transitioned the order.
    Applied,
    /// The order was already settled; redelivery or a lost race. No effect.
    AlreadyProcessed,
    /// Unknown event type or unknown intent. No effect.
    Ignored,
}

/// Consumes payment-provider events and applies them to orders.
///
/// Deliveries may be duplicated, concurrent, and out of order. Safety comes
/// from two layers: the terminal-state short-circuit (fast path for
/// redeliveries) and the store's conditional transitions (the actual
/// guarantee: exactly one concurrent caller wins, losers no-op as success).
pub struct WebhookReconciler<S, G> {
    store: S,
    gateway: G,
}

impl<S, G> WebhookReconciler<S, G>
where
    S: OrderStore + InventoryStore,
    G: PaymentGateway,
{
    /// Creates a reconciler over the given store and gateway.
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Handles one raw webhook delivery.
    ///
    /// Returns `Err(WebhookError::Rejected)` for requests that must not be
    /// retried (bad signature, undecodable payload) and
    /// `Err(WebhookError::Retry)` for storage failures the provider should
    /// redeliver after.
    #[tracing::instrument(skip(self, raw_body, signature_header))]
    pub async fn handle(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<Ack, WebhookError> {
        // 1. Authentication boundary: nothing runs on an unverified body.
        let event = self
            .gateway
            .verify_webhook(raw_body, signature_header)
            .map_err(|e| WebhookError::Rejected(e.to_string()))?;

        metrics::counter!("webhook_events_total").increment(1);
        let intent = &event.payment_intent_id;

        // 2. Correlate. An intent we never issued has no order to reconcile
        // and redelivery cannot create one; ack and move on.
        let Some(order) = self.store.find_by_intent(intent).await? else {
            tracing::warn!(
                %intent,
                event_id = %event.event_id,
                "webhook for unknown payment intent"
            );
            return Ok(Ack::Ignored);
        };

        // 3. Terminal-state short-circuit: settled orders are never revisited.
        if order.payment_state().is_terminal() {
            metrics::counter!("webhook_duplicates_total").increment(1);
            tracing::debug!(
                order_id = %order.id(),
                payment_state = %order.payment_state(),
                "duplicate delivery for settled order"
            );
            return Ok(Ack::AlreadyProcessed);
        }

        match event.kind {
            WebhookEventKind::PaymentSucceeded => {
                // 4. Single conditional update; a losing concurrent call
                // treats the no-op as success.
                match self.store.apply_payment_success(intent).await? {
                    TransitionOutcome::Applied => {
                        if let Err(e) = order.verify_totals() {
                            tracing::error!(
                                order_id = %order.id(),
                                error = %e,
                                "paid order failed totals check, manual reconciliation required"
                            );
                        }
                        metrics::counter!("webhook_payments_confirmed_total").increment(1);
                        tracing::info!(order_id = %order.id(), "payment confirmed");
                        Ok(Ack::Applied)
                    }
                    TransitionOutcome::NotApplied => Ok(Ack::AlreadyProcessed),
                }
            }
            WebhookEventKind::PaymentFailed => {
                // 5. Only the winner of the conditional update compensates,
                // so stock is released exactly once per order.
                match self.store.apply_payment_failure(intent).await? {
                    TransitionOutcome::Applied => {
                        self.release_order_stock(&order).await;
                        metrics::counter!("webhook_payments_failed_total").increment(1);
                        tracing::info!(order_id = %order.id(), "payment failed, order cancelled");
                        Ok(Ack::Applied)
                    }
                    TransitionOutcome::NotApplied => Ok(Ack::AlreadyProcessed),
                }
            }
            WebhookEventKind::Unknown(kind) => {
                // 6. Forward compatible: unknown events are acked, not errors.
                tracing::debug!(kind, "ignoring unhandled webhook event type");
                Ok(Ack::Ignored)
            }
        }
    }

    /// Returns every reserved unit of the order's lines to stock.
    ///
    /// Runs only after winning the failure transition, which is what makes
    /// it once-per-order. A failed release cannot be retried through
    /// redelivery (the order is already terminal), so it is surfaced at
    /// error level for manual reconciliation instead.
    async fn release_order_stock(&self, order: &Order) {
        for line in order.lines() {
            if let Err(e) = self.store.release(&line.product_id, line.quantity).await {
                tracing::error!(
                    order_id = %order.id(),
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %e,
                    "stock release failed during payment-failure compensation, \
                     manual reconciliation required"
                );
            }
        }
    }
}
