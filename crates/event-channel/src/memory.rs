use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{ChannelError, EventChannel, Message, MessageId, Result};

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of recent bodies kept per queue for [`InMemoryEventChannel::published`].
pub const PUBLISHED_HISTORY_LIMIT: usize = 1024;

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Message>,
    in_flight: HashMap<MessageId, (Message, Instant)>,
    published: VecDeque<String>,
}

impl QueueState {
    /// Makes in-flight messages whose visibility deadline has passed
    /// receivable again.
    fn requeue_expired(&mut self, now: Instant) {
        let expired: Vec<MessageId> = self
            .in_flight
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            if let Some((message, _)) = self.in_flight.remove(&id) {
                self.ready.push_back(message);
            }
        }
    }
}

/// In-memory event channel implementation for testing and local runs.
///
/// Mirrors the delivery semantics of a hosted queue: received messages stay
/// hidden until acknowledged or until the visibility timeout expires, after
/// which they are redelivered with an incremented receive count.
#[derive(Clone)]
pub struct InMemoryEventChannel {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
    visibility_timeout: Duration,
    fail_on_publish: Arc<AtomicBool>,
    fail_on_receive: Arc<AtomicBool>,
}

impl Default for InMemoryEventChannel {
    fn default() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl InMemoryEventChannel {
    /// Creates a new empty channel with the default visibility timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty channel with the given visibility timeout.
    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            visibility_timeout,
            fail_on_publish: Arc::new(AtomicBool::new(false)),
            fail_on_receive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configures every subsequent publish to fail with `Unavailable`.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Configures every subsequent receive to fail with `Unavailable`.
    pub fn set_fail_on_receive(&self, fail: bool) {
        self.fail_on_receive.store(fail, Ordering::SeqCst);
    }

    /// Returns the most recent bodies published to a queue, in publish order.
    ///
    /// At most [`PUBLISHED_HISTORY_LIMIT`] bodies are kept per queue.
    pub async fn published(&self, queue: &str) -> Vec<String> {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.published.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of messages waiting to be received.
    pub async fn pending(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.ready.len())
            .unwrap_or(0)
    }

    /// Returns the number of received but unacknowledged messages.
    pub async fn in_flight(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }

    /// Expires every in-flight message immediately, as if the visibility
    /// timeout had elapsed.
    pub async fn release_in_flight(&self, queue: &str) {
        let mut queues = self.queues.lock().await;
        if let Some(state) = queues.get_mut(queue) {
            let mut released: Vec<Message> =
                state.in_flight.drain().map(|(_, (m, _))| m).collect();
            released.sort_by_key(|m| m.sent_at);
            state.ready.extend(released);
        }
    }
}

#[async_trait]
impl EventChannel for InMemoryEventChannel {
    async fn publish(&self, queue: &str, body: String) -> Result<MessageId> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("publish rejected".to_string()));
        }

        let message = Message::new(queue, body.clone());
        let id = message.id;

        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.to_string()).or_default();
        if state.published.len() == PUBLISHED_HISTORY_LIMIT {
            state.published.pop_front();
        }
        state.published.push_back(body);
        state.ready.push_back(message);

        Ok(id)
    }

    async fn receive(&self, queue: &str, max_messages: usize) -> Result<Vec<Message>> {
        if self.fail_on_receive.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("receive rejected".to_string()));
        }

        let now = Instant::now();
        let mut queues = self.queues.lock().await;
        let Some(state) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        state.requeue_expired(now);

        let deadline = now + self.visibility_timeout;
        let mut batch = Vec::new();
        while batch.len() < max_messages {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.receive_count += 1;
            state
                .in_flight
                .insert(message.id, (message.clone(), deadline));
            batch.push(message);
        }

        Ok(batch)
    }

    async fn ack(&self, queue: &str, message_id: MessageId) -> Result<()> {
        let mut queues = self.queues.lock().await;
        if let Some(state) = queues.get_mut(queue)
            && state.in_flight.remove(&message_id).is_none()
        {
            state.ready.retain(|m| m.id != message_id);
        }
        Ok(())
    }
}
