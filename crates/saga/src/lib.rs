//! Order fulfillment saga.
//!
//! Three steps coordinate through the record store and two queues, with no
//! distributed transaction between them:
//!
//! 1. [`OrderCoordinator`] persists an order and publishes `OrderCreated`.
//! 2. [`PaymentRecorder`] consumes `OrderCreated` and records an
//!    `incomplete` payment (create-if-absent).
//! 3. [`PaymentProcessor`] moves a payment out of `incomplete` with a
//!    compare-and-swap and publishes `PaymentProcessed`.
//! 4. [`ShippingActivator`] consumes `PaymentProcessed` and marks the order
//!    ready for shipping.
//!
//! Queues deliver at least once, so every consuming step is idempotent.
//! [`Consumer`] drives the event-triggered steps from their queues.

pub mod consumer;
pub mod error;
pub mod order_coordinator;
pub mod payment_processor;
pub mod payment_recorder;
pub mod publish;
pub mod shipping_activator;

pub use consumer::{BatchReport, Consumer, DEFAULT_BATCH_SIZE, EventHandler};
pub use error::{Result, SagaError};
pub use order_coordinator::OrderCoordinator;
pub use payment_processor::PaymentProcessor;
pub use payment_recorder::PaymentRecorder;
pub use publish::publish_event;
pub use shipping_activator::ShippingActivator;
