//! Queue consumer that feeds events to a saga step.
//!
//! Each received message is decoded and handed to an [`EventHandler`]. The
//! outcome decides what happens to the message:
//!
//! - success: acknowledged
//! - terminal error (invalid payload, missing record, conflict): logged,
//!   acknowledged and dropped so it can't block the queue
//! - retryable error (store or channel failure): left unacknowledged, the
//!   channel redelivers it after its visibility timeout

use std::time::Duration;

use async_trait::async_trait;
use domain::IntegrationEvent;
use event_channel::{EventChannel, Message, MessageId};
use tokio::sync::watch;

use crate::error::{Result, SagaError};

/// Default number of messages requested per receive.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A saga step driven by events from a queue.
///
/// Handlers must tolerate the same event being delivered more than once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The event type this handler consumes.
    type Event: IntegrationEvent;

    /// Applies the event.
    async fn handle(&self, event: Self::Event) -> Result<()>;
}

/// Per-message outcome of one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Handled successfully and acknowledged.
    pub processed: Vec<MessageId>,
    /// Failed terminally, acknowledged and dropped.
    pub dropped: Vec<MessageId>,
    /// Failed transiently, left for redelivery.
    pub retry: Vec<MessageId>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.dropped.len() + self.retry.len()
    }
}

/// Polls a queue and dispatches its messages to a handler.
pub struct Consumer<C, H>
where
    C: EventChannel,
    H: EventHandler,
{
    channel: C,
    queue: String,
    handler: H,
    batch_size: usize,
}

impl<C, H> Consumer<C, H>
where
    C: EventChannel,
    H: EventHandler,
{
    pub fn new(channel: C, queue: impl Into<String>, handler: H) -> Self {
        Self {
            channel,
            queue: queue.into(),
            handler,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the maximum number of messages received per poll.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Receives one batch and processes it.
    ///
    /// Only a failing receive is reported as an error; per-message failures
    /// end up in the returned report.
    pub async fn poll_once(&self) -> Result<BatchReport> {
        let messages = self
            .channel
            .receive(&self.queue, self.batch_size)
            .await
            .map_err(SagaError::Receive)?;
        Ok(self.process_batch(messages).await)
    }

    /// Processes a received batch, one message at a time.
    ///
    /// A failing message never prevents the others from being handled.
    #[tracing::instrument(skip(self, messages), fields(queue = %self.queue, batch = messages.len()))]
    pub async fn process_batch(&self, messages: Vec<Message>) -> BatchReport {
        let mut report = BatchReport::default();
        metrics::histogram!("consumer_batch_size", "queue" => self.queue.clone())
            .record(messages.len() as f64);

        for message in messages {
            let message_id = message.id;
            let result = match H::Event::from_body(&message.body) {
                Ok(event) => self.handler.handle(event).await,
                Err(e) => Err(SagaError::from(e)),
            };

            match result {
                Ok(()) => {
                    self.ack(message_id).await;
                    self.count("processed");
                    report.processed.push(message_id);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        %message_id,
                        receive_count = message.receive_count,
                        error = %e,
                        "message failed, leaving for redelivery"
                    );
                    self.count("retry");
                    report.retry.push(message_id);
                }
                Err(e) => {
                    tracing::error!(
                        %message_id,
                        event_type = <H::Event as IntegrationEvent>::EVENT_TYPE,
                        body = %message.body,
                        error = %e,
                        "message failed permanently, dropping"
                    );
                    self.ack(message_id).await;
                    self.count("dropped");
                    report.dropped.push(message_id);
                }
            }
        }

        report
    }

    /// Polls the queue until `shutdown` flips to true or its sender is gone.
    ///
    /// Full batches are followed immediately by the next poll; the consumer
    /// only sleeps for `poll_interval` when the queue was empty or the
    /// receive failed.
    pub async fn run(&self, poll_interval: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(queue = %self.queue, batch_size = self.batch_size, "consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.poll_once().await {
                Ok(report) => report.is_empty(),
                Err(e) => {
                    tracing::error!(queue = %self.queue, error = %e, "receive failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(queue = %self.queue, "consumer stopped");
    }

    async fn ack(&self, message_id: MessageId) {
        // A lost ack only means the message comes back; handlers are idempotent.
        if let Err(e) = self.channel.ack(&self.queue, message_id).await {
            tracing::warn!(%message_id, error = %e, "failed to acknowledge message");
        }
    }

    fn count(&self, outcome: &'static str) {
        metrics::counter!(
            "consumer_messages_total",
            "queue" => self.queue.clone(),
            "outcome" => outcome
        )
        .increment(1);
    }
}
