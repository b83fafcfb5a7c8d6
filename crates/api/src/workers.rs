//! Background consumers for the event-driven saga steps.

use event_channel::EventChannel;
use record_store::RecordStore;
use saga::{Consumer, PaymentRecorder, ShippingActivator};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;

/// Spawns the payment recorder and shipping activator consumers.
///
/// Both stop once `shutdown` flips to true or its sender is dropped.
pub fn spawn_consumers<S, C>(
    store: S,
    channel: C,
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    S: RecordStore + Clone + 'static,
    C: EventChannel + Clone + 'static,
{
    let poll_interval = config.poll_interval;

    let recorder = Consumer::new(
        channel.clone(),
        config.orders_queue.clone(),
        PaymentRecorder::new(store.clone()),
    )
    .with_batch_size(config.batch_size);

    let activator = Consumer::new(
        channel,
        config.payments_queue.clone(),
        ShippingActivator::new(store),
    )
    .with_batch_size(config.batch_size);

    let recorder_shutdown = shutdown.clone();
    vec![
        tokio::spawn(async move { recorder.run(poll_interval, recorder_shutdown).await }),
        tokio::spawn(async move { activator.run(poll_interval, shutdown).await }),
    ]
}
