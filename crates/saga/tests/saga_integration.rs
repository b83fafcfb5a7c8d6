//! End-to-end tests for the order fulfillment saga over in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use common::OrderId;
use domain::{CreateOrderRequest, OrderCreated, PaymentProcessed, ProcessPaymentRequest};
use event_channel::{EventChannel, InMemoryEventChannel};
use record_store::{InMemoryRecordStore, RecordStoreExt};
use saga::{
    Consumer, OrderCoordinator, PaymentProcessor, PaymentRecorder, SagaError, ShippingActivator,
};
use tokio::sync::watch;

const ORDERS_QUEUE: &str = "orders-queue";
const PAYMENTS_QUEUE: &str = "payments-queue";

struct TestHarness {
    store: InMemoryRecordStore,
    channel: InMemoryEventChannel,
    coordinator: OrderCoordinator<InMemoryRecordStore, InMemoryEventChannel>,
    processor: Arc<PaymentProcessor<InMemoryRecordStore, InMemoryEventChannel>>,
    recorder: Consumer<InMemoryEventChannel, PaymentRecorder<InMemoryRecordStore>>,
    activator: Consumer<InMemoryEventChannel, ShippingActivator<InMemoryRecordStore>>,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryRecordStore::new();
        let channel = InMemoryEventChannel::new();

        Self {
            coordinator: OrderCoordinator::new(store.clone(), channel.clone(), ORDERS_QUEUE),
            processor: Arc::new(PaymentProcessor::new(
                store.clone(),
                channel.clone(),
                PAYMENTS_QUEUE,
            )),
            recorder: Consumer::new(
                channel.clone(),
                ORDERS_QUEUE,
                PaymentRecorder::new(store.clone()),
            ),
            activator: Consumer::new(
                channel.clone(),
                PAYMENTS_QUEUE,
                ShippingActivator::new(store.clone()),
            ),
            store,
            channel,
        }
    }

    async fn create_order(&self) -> OrderId {
        self.coordinator
            .create_order(CreateOrderRequest::new("u1", "widget", 2, 500))
            .await
            .unwrap()
            .order_id
    }

    async fn publish<E: serde::Serialize>(&self, queue: &str, event: &E) {
        let body = serde_json::to_string(event).unwrap();
        self.channel.publish(queue, body).await.unwrap();
    }
}

#[tokio::test]
async fn test_happy_path_full_fulfillment() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    let order = h.store.require_order(&order_id).await.unwrap();
    assert!(!order.shipping_ready);
    assert!(!h.store.payment_exists(&order_id).await.unwrap());

    let report = h.recorder.poll_once().await.unwrap();
    assert_eq!(report.processed.len(), 1);

    let payment = h.store.require_payment(&order_id).await.unwrap();
    assert!(payment.status.is_incomplete());
    assert_eq!(payment.total_price, 500);

    let payment = h
        .processor
        .process_payment(ProcessPaymentRequest::new(order_id.as_str(), "completed"))
        .await
        .unwrap();
    assert_eq!(payment.status.as_str(), "completed");

    let report = h.activator.poll_once().await.unwrap();
    assert_eq!(report.processed.len(), 1);

    let order = h.store.require_order(&order_id).await.unwrap();
    assert!(order.shipping_ready);
    assert_eq!(order.user_id, "u1");
    assert_eq!(order.item, "widget");
    assert_eq!(order.quantity, 2);
    assert_eq!(order.total_price, 500);

    assert_eq!(h.channel.pending(ORDERS_QUEUE).await, 0);
    assert_eq!(h.channel.pending(PAYMENTS_QUEUE).await, 0);
}

#[tokio::test]
async fn test_shipping_not_ready_until_payment_processed() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    h.recorder.poll_once().await.unwrap();

    let report = h.activator.poll_once().await.unwrap();
    assert!(report.is_empty());
    assert!(!h.store.require_order(&order_id).await.unwrap().shipping_ready);
}

#[tokio::test]
async fn test_duplicate_order_created_records_one_payment() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    h.publish(
        ORDERS_QUEUE,
        &OrderCreated {
            order_id: order_id.clone(),
            total_price: 500,
        },
    )
    .await;

    let report = h.recorder.poll_once().await.unwrap();
    assert_eq!(report.processed.len(), 2);
    assert_eq!(h.store.payment_count().await, 1);
}

#[tokio::test]
async fn test_redelivery_after_processing_keeps_payment_status() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    h.recorder.poll_once().await.unwrap();
    h.processor
        .process_payment(ProcessPaymentRequest::new(order_id.as_str(), "completed"))
        .await
        .unwrap();

    // Late duplicate of the original event.
    h.publish(
        ORDERS_QUEUE,
        &OrderCreated {
            order_id: order_id.clone(),
            total_price: 500,
        },
    )
    .await;
    h.recorder.poll_once().await.unwrap();

    let payment = h.store.require_payment(&order_id).await.unwrap();
    assert_eq!(payment.status.as_str(), "completed");
}

#[tokio::test]
async fn test_duplicate_payment_processed_is_idempotent() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    h.recorder.poll_once().await.unwrap();
    h.processor
        .process_payment(ProcessPaymentRequest::new(order_id.as_str(), "completed"))
        .await
        .unwrap();
    h.publish(
        PAYMENTS_QUEUE,
        &PaymentProcessed {
            order_id: order_id.clone(),
        },
    )
    .await;

    let report = h.activator.poll_once().await.unwrap();
    assert_eq!(report.processed.len(), 2);
    assert!(h.store.require_order(&order_id).await.unwrap().shipping_ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_processing_publishes_once() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    h.recorder.poll_once().await.unwrap();

    let handles: Vec<_> = ["completed", "failed", "completed", "refunded", "completed"]
        .into_iter()
        .map(|status| {
            let processor = Arc::clone(&h.processor);
            let order_id = order_id.clone();
            tokio::spawn(async move {
                processor
                    .process_payment(ProcessPaymentRequest::new(order_id.as_str(), status))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(SagaError::Conflict { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 4);
    assert_eq!(h.channel.published(PAYMENTS_QUEUE).await.len(), 1);
}

#[tokio::test]
async fn test_processing_before_recording_is_not_found() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    let result = h
        .processor
        .process_payment(ProcessPaymentRequest::new(order_id.as_str(), "completed"))
        .await;

    assert!(matches!(result, Err(SagaError::NotFound { .. })));
    assert!(h.channel.published(PAYMENTS_QUEUE).await.is_empty());
}

#[tokio::test]
async fn test_malformed_message_does_not_block_batch() {
    let h = TestHarness::new();

    let first = h.create_order().await;
    h.channel
        .publish(ORDERS_QUEUE, "{\"order_id\": 42}".to_string())
        .await
        .unwrap();
    let second = h.create_order().await;

    let report = h.recorder.poll_once().await.unwrap();
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.dropped.len(), 1);

    assert!(h.store.payment_exists(&first).await.unwrap());
    assert!(h.store.payment_exists(&second).await.unwrap());
    assert_eq!(h.channel.in_flight(ORDERS_QUEUE).await, 0);
}

#[tokio::test]
async fn test_payment_event_for_unknown_order_is_dropped() {
    let h = TestHarness::new();

    h.publish(
        PAYMENTS_QUEUE,
        &PaymentProcessed {
            order_id: OrderId::from("missing"),
        },
    )
    .await;

    let report = h.activator.poll_once().await.unwrap();
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(h.channel.pending(PAYMENTS_QUEUE).await, 0);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_store_outage_is_retried_on_redelivery() {
    let h = TestHarness::new();

    let order_id = h.create_order().await;
    h.store.set_fail_on_write(true);

    let report = h.recorder.poll_once().await.unwrap();
    assert_eq!(report.retry.len(), 1);
    assert!(!h.store.payment_exists(&order_id).await.unwrap());

    h.store.set_fail_on_write(false);
    h.channel.release_in_flight(ORDERS_QUEUE).await;

    let report = h.recorder.poll_once().await.unwrap();
    assert_eq!(report.processed.len(), 1);
    assert!(h.store.payment_exists(&order_id).await.unwrap());
}

#[tokio::test]
async fn test_running_consumers_complete_saga() {
    let store = InMemoryRecordStore::new();
    let channel = InMemoryEventChannel::new();
    let coordinator = OrderCoordinator::new(store.clone(), channel.clone(), ORDERS_QUEUE);
    let processor = PaymentProcessor::new(store.clone(), channel.clone(), PAYMENTS_QUEUE);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll = Duration::from_millis(5);

    let recorder = Consumer::new(
        channel.clone(),
        ORDERS_QUEUE,
        PaymentRecorder::new(store.clone()),
    );
    let activator = Consumer::new(
        channel.clone(),
        PAYMENTS_QUEUE,
        ShippingActivator::new(store.clone()),
    );
    let recorder_rx = shutdown_rx.clone();
    let recorder_task = tokio::spawn(async move { recorder.run(poll, recorder_rx).await });
    let activator_task = tokio::spawn(async move { activator.run(poll, shutdown_rx).await });

    let order_id = coordinator
        .create_order(CreateOrderRequest::new("u1", "widget", 2, 500))
        .await
        .unwrap()
        .order_id;

    let mut recorded = false;
    for _ in 0..200 {
        if store.payment_exists(&order_id).await.unwrap() {
            recorded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(recorded, "payment was never recorded");

    processor
        .process_payment(ProcessPaymentRequest::new(order_id.as_str(), "completed"))
        .await
        .unwrap();

    let mut ready = false;
    for _ in 0..200 {
        if store.require_order(&order_id).await.unwrap().shipping_ready {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(ready, "order never became shipping-ready");

    shutdown_tx.send(true).unwrap();
    recorder_task.await.unwrap();
    activator_task.await.unwrap();
}
