//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and
//! truncate the tables before each test, so they run serially.

use std::sync::Arc;

use domain::{CreateOrderRequest, Order, Payment, PaymentStatus};
use record_store::{
    InsertOutcome, OrderId, PostgresRecordStore, RecordStore, RecordStoreExt, StoreError,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_records.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresRecordStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, payments")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRecordStore::new(pool)
}

fn create_test_order() -> Order {
    Order::create(CreateOrderRequest::new("u1", "widget", 2, 500)).unwrap()
}

fn completed() -> PaymentStatus {
    PaymentStatus::terminal("completed").unwrap()
}

#[tokio::test]
#[serial]
async fn put_and_get_order() {
    let store = get_test_store().await;
    let order = create_test_order();

    store.put_order(&order).await.unwrap();

    let loaded = store.get_order(&order.order_id).await.unwrap();
    assert_eq!(loaded, Some(order));
}

#[tokio::test]
#[serial]
async fn get_missing_order_returns_none() {
    let store = get_test_store().await;
    let loaded = store.get_order(&OrderId::from("missing")).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
#[serial]
async fn mark_shipping_ready_twice_leaves_order_ready() {
    let store = get_test_store().await;
    let order = create_test_order();
    store.put_order(&order).await.unwrap();

    let first = store.mark_shipping_ready(&order.order_id).await.unwrap();
    let second = store.mark_shipping_ready(&order.order_id).await.unwrap();
    assert!(first.shipping_ready);
    assert!(second.shipping_ready);

    let loaded = store.require_order(&order.order_id).await.unwrap();
    assert!(loaded.shipping_ready);
}

#[tokio::test]
#[serial]
async fn mark_shipping_ready_on_missing_order_is_not_found() {
    let store = get_test_store().await;
    let result = store.mark_shipping_ready(&OrderId::from("missing")).await;
    assert!(matches!(result, Err(StoreError::RecordNotFound { .. })));
}

#[tokio::test]
#[serial]
async fn insert_payment_if_absent_is_idempotent() {
    let store = get_test_store().await;
    let order_id = OrderId::from("o-1");
    let payment = Payment::incomplete(order_id.clone(), 500);

    let first = store.insert_payment_if_absent(&payment).await.unwrap();
    let second = store.insert_payment_if_absent(&payment).await.unwrap();

    assert_eq!(first, InsertOutcome::Inserted);
    assert_eq!(second, InsertOutcome::AlreadyExists);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let loaded = store.require_payment(&order_id).await.unwrap();
    assert!(loaded.status.is_incomplete());
}

#[tokio::test]
#[serial]
async fn transition_payment_compare_and_swap() {
    let store = get_test_store().await;
    let order_id = OrderId::from("o-1");
    store
        .insert_payment_if_absent(&Payment::incomplete(order_id.clone(), 500))
        .await
        .unwrap();

    let updated = store
        .transition_payment(&order_id, &PaymentStatus::Incomplete, &completed())
        .await
        .unwrap();
    assert_eq!(updated.status, completed());

    let result = store
        .transition_payment(
            &order_id,
            &PaymentStatus::Incomplete,
            &PaymentStatus::terminal("failed").unwrap(),
        )
        .await;
    match result {
        Err(StoreError::ConditionFailed { actual, .. }) => assert_eq!(actual, "completed"),
        other => panic!("expected ConditionFailed, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn transition_missing_payment_is_not_found() {
    let store = get_test_store().await;
    let result = store
        .transition_payment(
            &OrderId::from("missing"),
            &PaymentStatus::Incomplete,
            &completed(),
        )
        .await;
    assert!(matches!(result, Err(StoreError::RecordNotFound { .. })));
}

#[tokio::test]
#[serial]
async fn concurrent_transitions_succeed_exactly_once() {
    let store = get_test_store().await;
    let order_id = OrderId::from("o-1");
    store
        .insert_payment_if_absent(&Payment::incomplete(order_id.clone(), 500))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let order_id = order_id.clone();
            tokio::spawn(async move {
                store
                    .transition_payment(&order_id, &PaymentStatus::Incomplete, &completed())
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(StoreError::ConditionFailed { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
}
