//! Domain model for the order fulfillment saga.
//!
//! This crate provides:
//! - The Order and Payment records with their validation rules
//! - The payment status state machine
//! - The integration events exchanged between services

pub mod error;
pub mod events;
pub mod order;
pub mod payment;

pub use error::ValidationError;
pub use events::{IntegrationEvent, OrderCreated, PaymentProcessed};
pub use order::{CreateOrderRequest, Order};
pub use payment::{Payment, PaymentStatus, ProcessPaymentRequest};
