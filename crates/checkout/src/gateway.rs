//! Payment gateway adapter trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use common::{CustomerId, IntentId, OrderId};
use domain::Money;

use crate::error::GatewayError;
use crate::signature;

/// Request to open a charge attempt for an order.
#[derive(Debug, Clone)]
pub struct CreateIntent {
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    /// ISO currency code.
    pub currency: String,
    /// Order metadata attached to the provider-side intent.
    pub order_id: OrderId,
    /// Customer metadata attached to the provider-side intent.
    pub customer_id: CustomerId,
}

/// A provider-side charge attempt handle.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// Correlation key between checkout and webhook deliveries.
    pub intent_id: IntentId,
    /// Opaque secret the client needs to complete payment entry.
    pub client_secret: String,
}

/// Event kind carried by a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    PaymentSucceeded,
    PaymentFailed,
    /// Anything else the provider may start sending; acked without effect.
    Unknown(String),
}

impl WebhookEventKind {
    fn parse(raw: &str) -> Self {
        match raw {
            "payment_succeeded" => WebhookEventKind::PaymentSucceeded,
            "payment_failed" => WebhookEventKind::PaymentFailed,
            other => WebhookEventKind::Unknown(other.to_string()),
        }
    }
}

/// A verified, decoded webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_id: String,
    pub kind: WebhookEventKind,
    pub payment_intent_id: IntentId,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    payment_intent_id: String,
}

/// Decodes a verified payload into a [`WebhookEvent`].
fn decode_event(raw_body: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let raw: RawEvent = serde_json::from_slice(raw_body)
        .map_err(|e| GatewayError::MalformedEvent(e.to_string()))?;

    Ok(WebhookEvent {
        event_id: raw.id,
        kind: WebhookEventKind::parse(&raw.kind),
        payment_intent_id: IntentId::new(raw.data.payment_intent_id),
    })
}

/// Contract the checkout core requires from a payment provider.
///
/// This is deliberately not a general gateway client: create-intent,
/// signature verification, and intent-id correlation are all the core needs.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for an order total.
    async fn create_intent(&self, req: CreateIntent) -> Result<PaymentIntent, GatewayError>;

    /// Verifies a webhook delivery's signature and decodes the event.
    ///
    /// This is the sole authentication boundary of the webhook endpoint;
    /// nothing downstream may run unless this succeeds.
    fn verify_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<IntentId, CreateIntent>,
    next_id: u32,
    fail_on_create: bool,
    hang_on_create: bool,
}

/// In-memory payment gateway for testing and default wiring.
///
/// Issues sequential `pi_`/`cs_` handles and verifies webhook signatures
/// with the same HMAC scheme a real provider would use.
#[derive(Clone)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
    webhook_secret: String,
}

impl InMemoryGateway {
    /// Creates a gateway that verifies webhooks against `webhook_secret`.
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryGatewayState::default())),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Configures the gateway to refuse the next create calls.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the gateway to stall create calls until the caller's
    /// timeout fires.
    pub fn set_hang_on_create(&self, hang: bool) {
        self.state.write().unwrap().hang_on_create = hang;
    }

    /// Returns the number of intents created.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }

    /// Returns true if an intent exists with the given ID.
    pub fn has_intent(&self, intent_id: &IntentId) -> bool {
        self.state.read().unwrap().intents.contains_key(intent_id)
    }

    /// Returns the amount an intent was opened for, in minor units.
    pub fn intent_amount(&self, intent_id: &IntentId) -> Option<Money> {
        self.state
            .read()
            .unwrap()
            .intents
            .get(intent_id)
            .map(|req| Money::from_cents(req.amount_minor))
    }

    /// Signs a payload the way the provider would, for driving the webhook
    /// endpoint in tests.
    pub fn sign_payload(&self, raw_body: &[u8]) -> String {
        signature::signature_header(&self.webhook_secret, Utc::now().timestamp(), raw_body)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(&self, req: CreateIntent) -> Result<PaymentIntent, GatewayError> {
        let hang = {
            let state = self.state.read().unwrap();
            state.hang_on_create
        };
        if hang {
            // Long enough that any sane orchestrator timeout fires first.
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }

        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::IntentCreation("card declined".to_string()));
        }

        state.next_id += 1;
        let intent_id = IntentId::new(format!("pi_{:04}", state.next_id));
        let client_secret = format!("cs_{:04}_secret", state.next_id);
        state.intents.insert(intent_id.clone(), req);

        Ok(PaymentIntent {
            intent_id,
            client_secret,
        })
    }

    fn verify_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        signature::verify(
            &self.webhook_secret,
            raw_body,
            signature_header,
            Utc::now().timestamp(),
        )?;
        decode_event(raw_body)
    }
}
