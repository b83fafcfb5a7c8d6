use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{Order, Payment, PaymentStatus};
use tokio::sync::RwLock;

use crate::{
    Collection, OrderId, Result, StoreError,
    store::{InsertOutcome, RecordStore},
};

/// In-memory record store implementation for testing and local runs.
///
/// Each collection sits behind its own lock, so every conditional operation
/// is atomic with respect to other callers sharing the same handle.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    payments: Arc<RwLock<HashMap<OrderId, Payment>>>,
    fail_on_write: Arc<AtomicBool>,
    fail_on_read: Arc<AtomicBool>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent write to fail with `Unavailable`.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    /// Configures every subsequent read to fail with `Unavailable`.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.fail_on_read.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }

    /// Clears both collections.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
        self.payments.write().await.clear();
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_on_read.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put_order(&self, order: &Order) -> Result<()> {
        self.check_write()?;
        self.orders
            .write()
            .await
            .insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.check_read()?;
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn mark_shipping_ready(&self, order_id: &OrderId) -> Result<Order> {
        self.check_write()?;
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: Collection::Orders,
                key: order_id.clone(),
            })?;
        order.shipping_ready = true;
        Ok(order.clone())
    }

    async fn insert_payment_if_absent(&self, payment: &Payment) -> Result<InsertOutcome> {
        self.check_write()?;
        let mut payments = self.payments.write().await;
        match payments.entry(payment.order_id.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(payment.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn get_payment(&self, order_id: &OrderId) -> Result<Option<Payment>> {
        self.check_read()?;
        Ok(self.payments.read().await.get(order_id).cloned())
    }

    async fn transition_payment(
        &self,
        order_id: &OrderId,
        expected: &PaymentStatus,
        next: &PaymentStatus,
    ) -> Result<Payment> {
        self.check_write()?;
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(order_id)
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: Collection::Payments,
                key: order_id.clone(),
            })?;

        if &payment.status != expected {
            return Err(StoreError::ConditionFailed {
                collection: Collection::Payments,
                key: order_id.clone(),
                expected: expected.to_string(),
                actual: payment.status.to_string(),
            });
        }

        payment.status = next.clone();
        Ok(payment.clone())
    }
}
