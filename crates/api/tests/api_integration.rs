//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{AddressId, CustomerId};
use domain::{Address, Money, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, InventoryStore, OrderStore};
use tower::ServiceExt;

use checkout::InMemoryGateway;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    gateway: InMemoryGateway,
    customer_id: CustomerId,
    address_id: AddressId,
}

async fn setup() -> TestApp {
    let config = api::config::Config::default();
    let (state, store, gateway) = api::create_default_state(&config);
    let app = api::create_app(state, get_metrics_handle());

    store
        .seed_product(Product::new("SKU-001", "Widget", Money::from_cents(1000)), 10)
        .await;
    store
        .seed_product(Product::new("SKU-002", "Gadget", Money::from_cents(2500)), 1)
        .await;

    let customer_id = CustomerId::new();
    let address_id = AddressId::new();
    store
        .seed_address(Address {
            id: address_id,
            customer_id,
            line1: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            created_at: Utc::now(),
        })
        .await;

    TestApp {
        app,
        store,
        gateway,
        customer_id,
        address_id,
    }
}

fn checkout_request(t: &TestApp, items: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("content-type", "application/json")
        .header("x-customer-id", t.customer_id.to_string())
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "address_id": t.address_id.to_string(),
                "items": items
            }))
            .unwrap(),
        ))
        .unwrap()
}

fn webhook_request(t: &TestApp, kind: &str, intent: &str) -> Request<Body> {
    let body = serde_json::to_vec(&serde_json::json!({
        "id": "evt_api_001",
        "type": kind,
        "data": { "payment_intent_id": intent }
    }))
    .unwrap();
    let signature = t.gateway.sign_payload(&body);

    Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("content-type", "application/json")
        .header("x-gateway-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_checkout_returns_client_secret() {
    let t = setup().await;

    let response = t
        .app
        .clone()
        .oneshot(checkout_request(
            &t,
            serde_json::json!([{ "product_id": "SKU-001", "quantity": 2 }]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert!(json["order_id"].as_str().is_some());
    assert!(json["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert!(json["client_secret"].as_str().unwrap().contains("secret"));

    assert_eq!(t.store.available(&"SKU-001".into()).await.unwrap(), Some(8));
}

#[tokio::test]
async fn test_checkout_without_customer_header_unauthorized() {
    let t = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "address_id": t.address_id.to_string(),
                "items": [{ "product_id": "SKU-001", "quantity": 1 }]
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_insufficient_stock_conflict() {
    let t = setup().await;

    let response = t
        .app
        .clone()
        .oneshot(checkout_request(
            &t,
            serde_json::json!([{ "product_id": "SKU-002", "quantity": 5 }]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = json_body(response).await;
    assert_eq!(json["code"], "insufficient_stock");

    // Nothing changed.
    assert_eq!(t.store.available(&"SKU-002".into()).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_checkout_invalid_address_bad_request() {
    let t = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("content-type", "application/json")
        .header("x-customer-id", t.customer_id.to_string())
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "address_id": uuid::Uuid::new_v4().to_string(),
                "items": [{ "product_id": "SKU-001", "quantity": 1 }]
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "invalid_address");
}

#[tokio::test]
async fn test_full_payment_flow_over_http() {
    let t = setup().await;

    // Checkout
    let response = t
        .app
        .clone()
        .oneshot(checkout_request(
            &t,
            serde_json::json!([{ "product_id": "SKU-001", "quantity": 2 }]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let order_id = created["order_id"].as_str().unwrap().to_string();

    // Find the intent through the order endpoint? The intent is internal;
    // fetch it from the store as the provider would know it out of band.
    let order = t
        .store
        .get_order(common::OrderId::from_uuid(
            uuid::Uuid::parse_str(&order_id).unwrap(),
        ))
        .await
        .unwrap()
        .unwrap();
    let intent = order.payment_intent_id().unwrap().clone();

    // Provider reports success.
    let response = t
        .app
        .clone()
        .oneshot(webhook_request(&t, "payment_succeeded", intent.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = json_body(response).await;
    assert_eq!(ack["outcome"], "applied");

    // Redelivery acks without effect.
    let response = t
        .app
        .clone()
        .oneshot(webhook_request(&t, "payment_succeeded", intent.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = json_body(response).await;
    assert_eq!(ack["outcome"], "already_processed");

    // Order endpoint shows the settled order.
    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["state"], "confirmed");
    assert_eq!(json["payment_state"], "paid");
    assert_eq!(
        json["total_cents"].as_i64().unwrap(),
        json["subtotal_cents"].as_i64().unwrap()
            + json["tax_cents"].as_i64().unwrap()
            + json["shipping_cents"].as_i64().unwrap()
    );
}

#[tokio::test]
async fn test_failed_payment_flow_restores_stock_over_http() {
    let t = setup().await;

    let response = t
        .app
        .clone()
        .oneshot(checkout_request(
            &t,
            serde_json::json!([{ "product_id": "SKU-001", "quantity": 3 }]),
        ))
        .await
        .unwrap();
    let created = json_body(response).await;
    let order_id = created["order_id"].as_str().unwrap().to_string();
    assert_eq!(t.store.available(&"SKU-001".into()).await.unwrap(), Some(7));

    let order = t
        .store
        .get_order(common::OrderId::from_uuid(
            uuid::Uuid::parse_str(&order_id).unwrap(),
        ))
        .await
        .unwrap()
        .unwrap();
    let intent = order.payment_intent_id().unwrap().clone();

    let response = t
        .app
        .clone()
        .oneshot(webhook_request(&t, "payment_failed", intent.as_str()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(t.store.available(&"SKU-001".into()).await.unwrap(), Some(10));

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["state"], "cancelled");
    assert_eq!(json["payment_state"], "failed");
}

#[tokio::test]
async fn test_webhook_bad_signature_unauthorized() {
    let t = setup().await;
    let imposter = InMemoryGateway::new("whsec_imposter");

    let body = serde_json::to_vec(&serde_json::json!({
        "id": "evt_bad",
        "type": "payment_succeeded",
        "data": { "payment_intent_id": "pi_0001" }
    }))
    .unwrap();
    let signature = imposter.sign_payload(&body);

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header("content-type", "application/json")
                .header("x-gateway-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_missing_signature_bad_request() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payment")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_storage_outage_service_unavailable() {
    let t = setup().await;

    t.store.set_fail_ops(true).await;
    let response = t
        .app
        .clone()
        .oneshot(webhook_request(&t, "payment_succeeded", "pi_0001"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_get_unknown_order_not_found() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
