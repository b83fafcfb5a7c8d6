use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{EventChannel, Message, MessageId, Result};

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL-backed event channel implementation.
///
/// Messages are rows in `queue_messages`. Receiving claims a batch with
/// `FOR UPDATE SKIP LOCKED` and pushes its visibility deadline forward, so
/// concurrent receivers never get the same message at the same time and an
/// unacknowledged message becomes receivable again once its deadline passes.
#[derive(Clone)]
pub struct PostgresEventChannel {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PostgresEventChannel {
    /// Creates a new PostgreSQL event channel with the default visibility timeout.
    pub fn new(pool: PgPool) -> Self {
        Self::with_visibility_timeout(pool, DEFAULT_VISIBILITY_TIMEOUT)
    }

    /// Creates a new PostgreSQL event channel with the given visibility timeout.
    pub fn with_visibility_timeout(pool: PgPool, visibility_timeout: Duration) -> Self {
        Self {
            pool,
            visibility_timeout,
        }
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

    fn row_to_message(row: PgRow) -> Result<Message> {
        Ok(Message {
            id: MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            queue: row.try_get("queue")?,
            body: row.try_get("body")?,
            receive_count: row.try_get::<i32, _>("receive_count")?.max(0) as u32,
            sent_at: row.try_get("sent_at")?,
        })
    }
}

#[async_trait]
impl EventChannel for PostgresEventChannel {
    async fn publish(&self, queue: &str, body: String) -> Result<MessageId> {
        let id = MessageId::new();

        sqlx::query(
            r#"
            INSERT INTO queue_messages (id, queue, body)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id.as_uuid())
        .bind(queue)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn receive(&self, queue: &str, max_messages: usize) -> Result<Vec<Message>> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            UPDATE queue_messages
            SET receive_count = receive_count + 1,
                visible_at = NOW() + make_interval(secs => $3)
            WHERE id IN (
                SELECT id FROM queue_messages
                WHERE queue = $1 AND visible_at <= NOW()
                ORDER BY sent_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, queue, body, receive_count, sent_at
            "#,
        )
        .bind(queue)
        .bind(max_messages as i64)
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .into_iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>>>()?;
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    async fn ack(&self, queue: &str, message_id: MessageId) -> Result<()> {
        sqlx::query("DELETE FROM queue_messages WHERE queue = $1 AND id = $2")
            .bind(queue)
            .bind(message_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
