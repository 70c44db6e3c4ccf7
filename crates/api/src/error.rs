//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, WebhookError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or invalid authentication.
    Unauthorized(String),
    /// Checkout flow error.
    Checkout(CheckoutError),
    /// Webhook handling error.
    Webhook(WebhookError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Webhook(err) => webhook_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        CheckoutError::EmptyCart | CheckoutError::Order(_) => {
            (StatusCode::BAD_REQUEST, "invalid_cart", message)
        }
        CheckoutError::InvalidAddress { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_address", message)
        }
        CheckoutError::ProductUnavailable { .. } => {
            (StatusCode::BAD_REQUEST, "product_unavailable", message)
        }
        // Expected contention, fully compensated; a conflict, not a fault.
        CheckoutError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "insufficient_stock", message)
        }
        CheckoutError::PaymentGateway(_) => {
            (StatusCode::BAD_GATEWAY, "payment_gateway_error", message)
        }
        CheckoutError::Store(inner) => store_error_to_response(inner),
    }
}

fn webhook_error_to_response(err: WebhookError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        // Non-retryable: the provider must not redeliver this request as-is.
        WebhookError::Rejected(_) => (StatusCode::UNAUTHORIZED, "webhook_rejected", message),
        // Retryable: ask the provider's delivery mechanism to try again.
        WebhookError::Retry(_) => {
            tracing::error!(error = %message, "webhook processing failed, requesting redelivery");
            (StatusCode::SERVICE_UNAVAILABLE, "retry_later", message)
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        StoreError::OrderNotFound(_) | StoreError::ProductNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found", message)
        }
        _ => {
            tracing::error!(error = %message, "store error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::Webhook(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Checkout(CheckoutError::Store(err))
    }
}
