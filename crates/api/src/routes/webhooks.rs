//! Payment-provider webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use checkout::{Ack, PaymentGateway};
use serde::Serialize;
use store::StorefrontStore;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the provider's signature over the raw body.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Serialize)]
pub struct WebhookAckResponse {
    pub status: &'static str,
    pub outcome: &'static str,
}

/// POST /webhooks/payment — reconcile an order with a provider event.
///
/// Responses encode the delivery contract: 200 means "do not redeliver"
/// (applied, duplicate, or ignorable), 401 means "this request is bad, do
/// not retry it as-is", 503 means "our storage hiccuped, redeliver".
#[tracing::instrument(skip(state, headers, body))]
pub async fn payment<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, ApiError>
where
    S: StorefrontStore + 'static,
    G: PaymentGateway + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;

    let ack = state.reconciler.handle(&body, signature).await?;

    let outcome = match ack {
        Ack::Applied => "applied",
        Ack::AlreadyProcessed => "already_processed",
        Ack::Ignored => "ignored",
    };

    Ok(Json(WebhookAckResponse {
        status: "ok",
        outcome,
    }))
}
