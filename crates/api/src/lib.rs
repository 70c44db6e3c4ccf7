//! HTTP API server for the storefront checkout core.
//!
//! Exposes the checkout endpoint, the payment-provider webhook endpoint, and
//! order lookup, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CheckoutOrchestrator, InMemoryGateway, PaymentGateway, WebhookReconciler};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, StorefrontStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G> {
    pub orchestrator: CheckoutOrchestrator<S, G>,
    pub reconciler: WebhookReconciler<S, G>,
    pub store: S,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: StorefrontStore + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::checkout::create::<S, G>))
        .route("/webhooks/payment", post(routes::webhooks::payment::<S, G>))
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires an application state over any store backend and gateway.
pub fn create_state<S, G>(store: S, gateway: G, config: &Config) -> Arc<AppState<S, G>>
where
    S: StorefrontStore + Clone,
    G: PaymentGateway + Clone,
{
    let orchestrator = CheckoutOrchestrator::new(store.clone(), gateway.clone())
        .with_pricing(config.pricing())
        .with_gateway_timeout(Duration::from_millis(config.gateway_timeout_ms));
    let reconciler = WebhookReconciler::new(store.clone(), gateway);

    Arc::new(AppState {
        orchestrator,
        reconciler,
        store,
    })
}

/// Creates the default in-memory application state.
///
/// Returns the store and gateway handles alongside the state so callers
/// (tests, seeding) can reach them directly.
pub fn create_default_state(
    config: &Config,
) -> (
    Arc<AppState<InMemoryStore, InMemoryGateway>>,
    InMemoryStore,
    InMemoryGateway,
) {
    let store = InMemoryStore::new();
    let gateway = InMemoryGateway::new(config.webhook_secret.clone());
    let state = create_state(store.clone(), gateway.clone(), config);
    (state, store, gateway)
}
