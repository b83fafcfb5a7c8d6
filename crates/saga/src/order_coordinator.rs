//! First saga step: validate and persist an order, then announce it.

use domain::{CreateOrderRequest, Order, OrderCreated};
use event_channel::EventChannel;
use record_store::RecordStore;

use crate::error::{Result, SagaError};
use crate::publish::publish_event;

/// Creates orders and publishes `OrderCreated` for the payment recorder.
///
/// The order is written before the event is published. The two steps are
/// not atomic: if publishing fails the order exists but no payment will be
/// recorded for it until an external reconciliation re-publishes the event.
/// The failure is returned to the caller, never swallowed.
pub struct OrderCoordinator<S, C>
where
    S: RecordStore,
    C: EventChannel,
{
    store: S,
    channel: C,
    queue: String,
}

impl<S, C> OrderCoordinator<S, C>
where
    S: RecordStore,
    C: EventChannel,
{
    /// Creates a coordinator publishing to the given queue.
    pub fn new(store: S, channel: C, queue: impl Into<String>) -> Self {
        Self {
            store,
            channel,
            queue: queue.into(),
        }
    }

    /// Returns the queue `OrderCreated` events are published to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Validates the request, persists a new order and publishes `OrderCreated`.
    ///
    /// Nothing is persisted when validation fails.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        let order = Order::create(request).map_err(|e| {
            tracing::warn!(error = %e, "order request rejected");
            SagaError::from(e)
        })?;
        let order_id = order.order_id.clone();

        self.store.put_order(&order).await.map_err(|e| {
            tracing::error!(%order_id, error = %e, "failed to persist order");
            SagaError::from(e)
        })?;

        let event = OrderCreated {
            order_id: order_id.clone(),
            total_price: order.total_price,
        };
        if let Err(e) = publish_event(&self.channel, &self.queue, &event).await {
            tracing::error!(
                %order_id,
                error = %e,
                "order persisted but OrderCreated was not published; requires reconciliation"
            );
            metrics::counter!("orders_unpublished_total").increment(1);
            return Err(e);
        }

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%order_id, total_price = order.total_price, "order created");

        Ok(order)
    }
}
