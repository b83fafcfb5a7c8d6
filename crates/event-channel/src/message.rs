use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message, used to acknowledge it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a message ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier used to acknowledge the message.
    pub id: MessageId,

    /// The queue the message was published to.
    pub queue: String,

    /// The message payload, JSON text.
    pub body: String,

    /// How many times the message has been handed to a consumer,
    /// including this delivery.
    pub receive_count: u32,

    /// When the message was published.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message that has not been received yet.
    pub fn new(queue: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            queue: queue.into(),
            body: body.into(),
            receive_count: 0,
            sent_at: Utc::now(),
        }
    }

    /// Returns true if this delivery is a redelivery.
    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}
