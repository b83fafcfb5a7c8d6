//! Second saga step: record an incomplete payment for every created order.

use async_trait::async_trait;
use domain::{OrderCreated, Payment, ValidationError};
use record_store::{InsertOutcome, RecordStore};

use crate::consumer::EventHandler;
use crate::error::Result;

/// Consumes `OrderCreated` and creates the matching payment.
///
/// The payment is written with create-if-absent, so redelivered events
/// leave the existing payment untouched.
pub struct PaymentRecorder<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> PaymentRecorder<S> {
    /// Creates a new payment recorder.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records an `incomplete` payment for the order in the event.
    ///
    /// Returns `AlreadyExists` when a payment was recorded by an earlier
    /// delivery; that is not an error.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id))]
    pub async fn record(&self, event: OrderCreated) -> Result<InsertOutcome> {
        if event.order_id.is_empty() {
            return Err(ValidationError::MissingField { field: "order_id" }.into());
        }

        let payment = Payment::incomplete(event.order_id, event.total_price);
        let outcome = self.store.insert_payment_if_absent(&payment).await?;

        match outcome {
            InsertOutcome::Inserted => {
                metrics::counter!("payments_recorded_total").increment(1);
                tracing::info!(total_price = payment.total_price, "payment recorded");
            }
            InsertOutcome::AlreadyExists => {
                metrics::counter!("payments_duplicate_total").increment(1);
                tracing::debug!("payment already recorded, skipping duplicate delivery");
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl<S: RecordStore> EventHandler for PaymentRecorder<S> {
    type Event = OrderCreated;

    async fn handle(&self, event: OrderCreated) -> Result<()> {
        self.record(event).await.map(|_| ())
    }
}
