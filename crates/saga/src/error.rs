//! Saga error types.

use common::OrderId;
use domain::ValidationError;
use event_channel::ChannelError;
use record_store::{Collection, StoreError};
use thiserror::Error;

/// Errors that can occur during saga operations.
///
/// `InvalidRequest`, `NotFound` and `Conflict` are terminal for the request
/// or message that caused them. `Persistence`, `Publish`, `Receive` and `Serialization`
/// are infrastructure failures; the caller or the queue is expected to retry
/// the whole operation, which every write path tolerates.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request or event payload failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// The referenced record does not exist.
    #[error("Not found: no {collection} record for order {order_id}")]
    NotFound {
        collection: Collection,
        order_id: OrderId,
    },

    /// A state precondition was violated.
    #[error("Conflict on order {order_id}: {reason}")]
    Conflict { order_id: OrderId, reason: String },

    /// The record store failed.
    #[error("Persistence error: {0}")]
    Persistence(StoreError),

    /// An event could not be published.
    #[error("Publish error: {0}")]
    Publish(#[from] ChannelError),

    /// Messages could not be received from a queue.
    #[error("Receive error: {0}")]
    Receive(ChannelError),

    /// An event could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true if repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SagaError::Persistence(_)
                | SagaError::Publish(_)
                | SagaError::Receive(_)
                | SagaError::Serialization(_)
        )
    }
}

impl From<StoreError> for SagaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound { collection, key } => SagaError::NotFound {
                collection,
                order_id: key,
            },
            StoreError::ConditionFailed {
                key,
                expected,
                actual,
                ..
            } => SagaError::Conflict {
                order_id: key,
                reason: format!("expected status {expected}, found {actual}"),
            },
            other => SagaError::Persistence(other),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
