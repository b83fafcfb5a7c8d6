//! Payment processing and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{Payment, ProcessPaymentRequest};
use event_channel::EventChannel;
use record_store::RecordStore;

use crate::AppState;
use crate::error::ApiError;

/// POST /payments: settle the payment of an order.
#[tracing::instrument(skip(state, payload))]
pub async fn process<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    payload: Result<Json<ProcessPaymentRequest>, JsonRejection>,
) -> Result<Json<Payment>, ApiError>
where
    S: RecordStore + 'static,
    C: EventChannel + 'static,
{
    let Json(request) = payload?;
    let payment = state.processor.process_payment(request).await?;
    Ok(Json(payment))
}

/// GET /payments/{order_id}: current payment record.
#[tracing::instrument(skip(state))]
pub async fn get<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(order_id): Path<String>,
) -> Result<Json<Payment>, ApiError>
where
    S: RecordStore + 'static,
    C: EventChannel + 'static,
{
    let order_id = OrderId::from(order_id);
    state
        .store
        .get_payment(&order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Payment for order {order_id} not found")))
}
