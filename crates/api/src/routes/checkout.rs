//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use checkout::PaymentGateway;
use common::{AddressId, CustomerId};
use domain::CartLine;
use serde::{Deserialize, Serialize};
use store::StorefrontStore;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the authenticated customer ID. Session issuance and
/// validation happen upstream; the ID arrives here opaque.
pub const CUSTOMER_HEADER: &str = "x-customer-id";

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub address_id: uuid::Uuid,
    pub items: Vec<CheckoutItemRequest>,
}

#[derive(Deserialize)]
pub struct CheckoutItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub order_number: String,
    pub client_secret: String,
}

/// Extracts the authenticated customer ID from request headers.
pub(crate) fn customer_from_headers(headers: &HeaderMap) -> Result<CustomerId, ApiError> {
    let raw = headers
        .get(CUSTOMER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {CUSTOMER_HEADER} header")))?;

    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::Unauthorized(format!("invalid {CUSTOMER_HEADER} header: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

/// POST /checkout — reserve stock, create the order, open a payment intent.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError>
where
    S: StorefrontStore + 'static,
    G: PaymentGateway + 'static,
{
    let customer_id = customer_from_headers(&headers)?;
    let address_id = AddressId::from_uuid(req.address_id);

    let cart: Vec<CartLine> = req
        .items
        .iter()
        .map(|item| CartLine::new(item.product_id.as_str(), item.quantity))
        .collect();

    let receipt = state
        .orchestrator
        .checkout(customer_id, address_id, cart)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: receipt.order_id.to_string(),
            order_number: receipt.order_number.to_string(),
            client_secret: receipt.client_secret,
        }),
    ))
}
