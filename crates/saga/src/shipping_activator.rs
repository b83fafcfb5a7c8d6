//! Final saga step: mark the order ready for shipping.

use async_trait::async_trait;
use domain::{Order, PaymentProcessed, ValidationError};
use record_store::RecordStore;

use crate::consumer::EventHandler;
use crate::error::Result;

/// Consumes `PaymentProcessed` and flips the order's `shipping_ready` flag.
///
/// Setting the flag is idempotent, so redelivered events are harmless.
pub struct ShippingActivator<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> ShippingActivator<S> {
    /// Creates a new shipping activator.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Marks the order in the event as ready for shipping.
    ///
    /// Fails with `NotFound` if the order doesn't exist.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id))]
    pub async fn activate(&self, event: PaymentProcessed) -> Result<Order> {
        if event.order_id.is_empty() {
            return Err(ValidationError::MissingField { field: "order_id" }.into());
        }

        let order = self
            .store
            .mark_shipping_ready(&event.order_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to mark order shipping-ready");
                e
            })?;

        metrics::counter!("shipping_activations_total").increment(1);
        tracing::info!("order ready for shipping");

        Ok(order)
    }
}

#[async_trait]
impl<S: RecordStore> EventHandler for ShippingActivator<S> {
    type Event = PaymentProcessed;

    async fn handle(&self, event: PaymentProcessed) -> Result<()> {
        self.activate(event).await.map(|_| ())
    }
}
