use async_trait::async_trait;

use crate::{Message, MessageId, Result};

/// Core trait for event channel implementations.
///
/// Delivery is at-least-once and unordered between messages: a received
/// message that is not acknowledged before its visibility timeout expires is
/// handed out again, and the same message may therefore be seen by a
/// consumer any number of times. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Publishes a message body to a queue.
    ///
    /// Returns the id assigned to the message.
    async fn publish(&self, queue: &str, body: String) -> Result<MessageId>;

    /// Receives up to `max_messages` visible messages from a queue.
    ///
    /// Returned messages are hidden from other receivers until they are
    /// acknowledged or their visibility timeout expires.
    async fn receive(&self, queue: &str, max_messages: usize) -> Result<Vec<Message>>;

    /// Acknowledges a message, removing it from the queue.
    ///
    /// Acknowledging an unknown or already acknowledged message is a no-op.
    async fn ack(&self, queue: &str, message_id: MessageId) -> Result<()>;
}
