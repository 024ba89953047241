//! HTTP and SOAP transport adapters for the boutique backend.
//!
//! Translates wire requests into entity service calls and maps the domain
//! error taxonomy to wire status codes and fault structures, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod soap;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use domain::{OrderService, ProductService, ReviewService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub products: ProductService<S>,
    pub orders: OrderService<S>,
    pub reviews: ReviewService<S>,
}

/// Creates the application state over a storage gateway.
pub fn create_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        products: ProductService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        reviews: ReviewService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", patch(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::delete::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}", patch(routes::orders::update::<S>))
        .route("/orders/{id}", delete(routes::orders::delete::<S>))
        .route("/reviews", post(routes::reviews::create::<S>))
        .route("/reviews", get(routes::reviews::list::<S>))
        .route("/reviews/{id}", get(routes::reviews::get::<S>))
        .route("/reviews/{id}", patch(routes::reviews::update::<S>))
        .route("/reviews/{id}", delete(routes::reviews::delete::<S>))
        .route("/soap/products", post(soap::create_product::<S>))
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
