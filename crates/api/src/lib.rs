//! HTTP API server and queue workers for the order fulfillment saga.
//!
//! Exposes order creation and payment processing over REST, runs the
//! event consumers in the background, and reports through structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod workers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_channel::EventChannel;
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::RecordStore;
use saga::{OrderCoordinator, PaymentProcessor};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S, C>
where
    S: RecordStore,
    C: EventChannel,
{
    pub coordinator: OrderCoordinator<S, C>,
    pub processor: PaymentProcessor<S, C>,
    pub store: S,
}

impl<S, C> AppState<S, C>
where
    S: RecordStore + Clone,
    C: EventChannel + Clone,
{
    /// Wires the request-driven saga steps to a store and channel.
    pub fn new(store: S, channel: C, config: &Config) -> Self {
        Self {
            coordinator: OrderCoordinator::new(
                store.clone(),
                channel.clone(),
                config.orders_queue.clone(),
            ),
            processor: PaymentProcessor::new(
                store.clone(),
                channel,
                config.payments_queue.clone(),
            ),
            store,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C>(state: Arc<AppState<S, C>>, metrics_handle: PrometheusHandle) -> Router
where
    S: RecordStore + 'static,
    C: EventChannel + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S, C>))
        .route("/orders/{order_id}", get(routes::orders::get::<S, C>))
        .route("/payments", post(routes::payments::process::<S, C>))
        .route("/payments/{order_id}", get(routes::payments::get::<S, C>))
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
