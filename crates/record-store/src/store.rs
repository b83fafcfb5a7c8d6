use async_trait::async_trait;
use domain::{Order, Payment, PaymentStatus};

use crate::{Collection, OrderId, Result, StoreError};

/// Outcome of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record did not exist and was written.
    Inserted,
    /// A record already existed under the key; nothing was written.
    AlreadyExists,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}

/// Core trait for record store implementations.
///
/// The store holds two independent collections, Orders and Payments, both
/// keyed by order id. Every mutation touches exactly one record; correctness
/// under concurrent callers comes from the conditional operations below,
/// never from locks held by the caller. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes an order unconditionally, replacing any record under its key.
    async fn put_order(&self, order: &Order) -> Result<()>;

    /// Retrieves an order by id.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Sets `shipping_ready` to true and returns the updated order.
    ///
    /// Repeating the call on an order that is already shipping-ready is a
    /// no-op. Fails with `RecordNotFound` if the order doesn't exist; the
    /// order is never created by this call.
    async fn mark_shipping_ready(&self, order_id: &OrderId) -> Result<Order>;

    /// Writes a payment only if no payment exists for its order id.
    async fn insert_payment_if_absent(&self, payment: &Payment) -> Result<InsertOutcome>;

    /// Retrieves a payment by order id.
    ///
    /// Returns None if the payment doesn't exist.
    async fn get_payment(&self, order_id: &OrderId) -> Result<Option<Payment>>;

    /// Atomically replaces a payment's status if it currently equals `expected`.
    ///
    /// The check and the write are a single store operation, so of several
    /// concurrent callers expecting the same prior status at most one
    /// succeeds. Fails with `ConditionFailed` if the stored status differs
    /// and `RecordNotFound` if the payment doesn't exist.
    async fn transition_payment(
        &self,
        order_id: &OrderId,
        expected: &PaymentStatus,
        next: &PaymentStatus,
    ) -> Result<Payment>;
}

/// Extension trait providing convenience methods for record stores.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Loads an order, failing with `RecordNotFound` if it doesn't exist.
    async fn require_order(&self, order_id: &OrderId) -> Result<Order> {
        self.get_order(order_id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: Collection::Orders,
                key: order_id.clone(),
            })
    }

    /// Loads a payment, failing with `RecordNotFound` if it doesn't exist.
    async fn require_payment(&self, order_id: &OrderId) -> Result<Payment> {
        self.get_payment(order_id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: Collection::Payments,
                key: order_id.clone(),
            })
    }

    /// Checks if a payment has been recorded for an order.
    async fn payment_exists(&self, order_id: &OrderId) -> Result<bool> {
        Ok(self.get_payment(order_id).await?.is_some())
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}
