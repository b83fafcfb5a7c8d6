//! Event publication helper shared by the saga services.

use domain::IntegrationEvent;
use event_channel::{EventChannel, MessageId};

use crate::error::Result;

/// Encodes an integration event and publishes it to a queue.
pub async fn publish_event<C, E>(channel: &C, queue: &str, event: &E) -> Result<MessageId>
where
    C: EventChannel + ?Sized,
    E: IntegrationEvent,
{
    let body = serde_json::to_string(event)?;
    let message_id = channel.publish(queue, body).await?;

    tracing::debug!(
        event_type = E::EVENT_TYPE,
        order_id = %event.order_id(),
        %message_id,
        queue,
        "event published"
    );
    Ok(message_id)
}
