//! Third saga step: move a payment out of `incomplete`, exactly once.

use domain::{Payment, PaymentProcessed, PaymentStatus, ProcessPaymentRequest};
use event_channel::EventChannel;
use record_store::{Collection, RecordStore};

use crate::error::{Result, SagaError};
use crate::publish::publish_event;

/// Processes payments and publishes `PaymentProcessed` for the shipping
/// activator.
///
/// Two requests for the same order may run at the same time. The status
/// read up front only gives an early answer for payments that are already
/// processed; the decision itself is the store's compare-and-swap, which
/// lets exactly one of the racing requests move the payment out of
/// `incomplete`. The losers get `Conflict` and publish nothing.
///
/// As with order creation, the transition and the publish are not atomic:
/// if publishing fails the payment stays processed and the error is
/// returned, and a repeated request is answered with `Conflict`.
pub struct PaymentProcessor<S, C>
where
    S: RecordStore,
    C: EventChannel,
{
    store: S,
    channel: C,
    queue: String,
}

impl<S, C> PaymentProcessor<S, C>
where
    S: RecordStore,
    C: EventChannel,
{
    /// Creates a processor publishing to the given queue.
    pub fn new(store: S, channel: C, queue: impl Into<String>) -> Self {
        Self {
            store,
            channel,
            queue: queue.into(),
        }
    }

    /// Returns the queue `PaymentProcessed` events are published to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Transitions the payment for `request.order_id` to `request.status`.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, status = %request.status))]
    pub async fn process_payment(&self, request: ProcessPaymentRequest) -> Result<Payment> {
        let (order_id, status) = request.validate().map_err(|e| {
            tracing::warn!(error = %e, "payment request rejected");
            SagaError::from(e)
        })?;

        let current = self
            .store
            .get_payment(&order_id)
            .await?
            .ok_or_else(|| SagaError::NotFound {
                collection: Collection::Payments,
                order_id: order_id.clone(),
            })?;

        if !current.status.is_incomplete() {
            metrics::counter!("payment_conflicts_total").increment(1);
            tracing::info!(current_status = %current.status, "payment already processed");
            return Err(SagaError::Conflict {
                order_id,
                reason: format!("payment already processed with status {}", current.status),
            });
        }

        let updated = match self
            .store
            .transition_payment(&order_id, &PaymentStatus::Incomplete, &status)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                let err = SagaError::from(e);
                if matches!(err, SagaError::Conflict { .. }) {
                    metrics::counter!("payment_conflicts_total").increment(1);
                    tracing::info!("lost race for payment transition");
                } else {
                    tracing::error!(error = %err, "failed to transition payment");
                }
                return Err(err);
            }
        };

        let event = PaymentProcessed {
            order_id: order_id.clone(),
        };
        if let Err(e) = publish_event(&self.channel, &self.queue, &event).await {
            tracing::error!(
                error = %e,
                "payment processed but PaymentProcessed was not published; requires reconciliation"
            );
            metrics::counter!("payments_unpublished_total").increment(1);
            return Err(e);
        }

        metrics::counter!("payments_processed_total", "status" => updated.status.to_string())
            .increment(1);
        tracing::info!(status = %updated.status, "payment processed");

        Ok(updated)
    }
}
