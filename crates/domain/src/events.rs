//! Integration events exchanged between the saga services.
//!
//! Events carry only what the downstream consumer needs and travel as JSON
//! text through the event channel.

use common::OrderId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Result;

/// An event published to, and consumed from, the event channel.
pub trait IntegrationEvent: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the event type, used in logs and metrics labels.
    const EVENT_TYPE: &'static str;

    /// The order this event belongs to.
    fn order_id(&self) -> &OrderId;

    /// Decodes an event from a message body.
    fn from_body(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Published after an order has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub total_price: i64,
}

impl IntegrationEvent for OrderCreated {
    const EVENT_TYPE: &'static str = "OrderCreated";

    fn order_id(&self) -> &OrderId {
        &self.order_id
    }
}

/// Published after a payment left the `incomplete` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcessed {
    pub order_id: OrderId,
}

impl IntegrationEvent for PaymentProcessed {
    const EVENT_TYPE: &'static str = "PaymentProcessed";

    fn order_id(&self) -> &OrderId {
        &self.order_id
    }
}
