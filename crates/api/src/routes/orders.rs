//! Order lookup endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::PaymentGateway;
use common::OrderId;
use domain::Order;
use serde::Serialize;
use store::StorefrontStore;

use crate::AppState;
use crate::error::ApiError;

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub number: String,
    pub state: String,
    pub payment_state: String,
    pub lines: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_subtotal_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            id: order.id().to_string(),
            number: order.number().to_string(),
            state: order.state().to_string(),
            payment_state: order.payment_state().to_string(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    line_subtotal_cents: line.line_subtotal().cents(),
                })
                .collect(),
            subtotal_cents: order.subtotal().cents(),
            tax_cents: order.tax().cents(),
            shipping_cents: order.shipping_cost().cents(),
            total_cents: order.total().cents(),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

/// GET /orders/{id} — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: StorefrontStore + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
