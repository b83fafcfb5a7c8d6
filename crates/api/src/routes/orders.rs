//! Order creation and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{CreateOrderRequest, Order};
use event_channel::EventChannel;
use record_store::RecordStore;

use crate::AppState;
use crate::error::ApiError;

/// POST /orders: create an order and start the saga.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError>
where
    S: RecordStore + 'static,
    C: EventChannel + 'static,
{
    let Json(request) = payload?;
    let order = state.coordinator.create_order(request).await?;
    Ok(Json(order))
}

/// GET /orders/{order_id}: current order record.
#[tracing::instrument(skip(state))]
pub async fn get<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError>
where
    S: RecordStore + 'static,
    C: EventChannel + 'static,
{
    let order_id = OrderId::from(order_id);
    state
        .store
        .get_order(&order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))
}
