use async_trait::async_trait;
use domain::{Order, Payment, PaymentStatus};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Collection, OrderId, Result, StoreError,
    store::{InsertOutcome, RecordStore},
};

/// PostgreSQL-backed record store implementation.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            order_id: OrderId::from(row.try_get::<String, _>("order_id")?),
            user_id: row.try_get("user_id")?,
            item: row.try_get("item")?,
            quantity: row.try_get("quantity")?,
            total_price: row.try_get("total_price")?,
            shipping_ready: row.try_get("shipping_ready")?,
        })
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        Ok(Payment {
            order_id: OrderId::from(row.try_get::<String, _>("order_id")?),
            total_price: row.try_get("total_price")?,
            status: PaymentStatus::from(row.try_get::<String, _>("status")?),
        })
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn put_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, item, quantity, total_price, shipping_ready)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                item = EXCLUDED.item,
                quantity = EXCLUDED.quantity,
                total_price = EXCLUDED.total_price,
                shipping_ready = EXCLUDED.shipping_ready,
                updated_at = NOW()
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(&order.user_id)
        .bind(&order.item)
        .bind(order.quantity)
        .bind(order.total_price)
        .bind(order.shipping_ready)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT order_id, user_id, item, quantity, total_price, shipping_ready
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn mark_shipping_ready(&self, order_id: &OrderId) -> Result<Order> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE orders
            SET shipping_ready = TRUE, updated_at = NOW()
            WHERE order_id = $1
            RETURNING order_id, user_id, item, quantity, total_price, shipping_ready
            "#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::RecordNotFound {
                collection: Collection::Orders,
                key: order_id.clone(),
            }),
        }
    }

    async fn insert_payment_if_absent(&self, payment: &Payment) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (order_id, total_price, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(payment.order_id.as_str())
        .bind(payment.total_price)
        .bind(payment.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn get_payment(&self, order_id: &OrderId) -> Result<Option<Payment>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT order_id, total_price, status
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn transition_payment(
        &self,
        order_id: &OrderId,
        expected: &PaymentStatus,
        next: &PaymentStatus,
    ) -> Result<Payment> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE payments
            SET status = $3, updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            RETURNING order_id, total_price, status
            "#,
        )
        .bind(order_id.as_str())
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_payment(row);
        }

        // The update matched nothing: report why, without retrying the write.
        let actual: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE order_id = $1")
                .bind(order_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => Err(StoreError::ConditionFailed {
                collection: Collection::Payments,
                key: order_id.clone(),
                expected: expected.to_string(),
                actual,
            }),
            None => Err(StoreError::RecordNotFound {
                collection: Collection::Payments,
                key: order_id.clone(),
            }),
        }
    }
}
