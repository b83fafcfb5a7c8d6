//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::{Config, LogFormat};
use event_channel::{EventChannel, InMemoryEventChannel, PostgresEventChannel};
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Runs the HTTP server and the queue consumers until a shutdown signal.
async fn serve<S, C>(
    config: Config,
    store: S,
    channel: C,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError>
where
    S: RecordStore + Clone + 'static,
    C: EventChannel + Clone + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers =
        api::workers::spawn_consumers(store.clone(), channel.clone(), &config, shutdown_rx);

    let state = Arc::new(AppState::new(store, channel, &config));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Workers finish their current batch before exiting.
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "consumer task failed");
        }
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Pick the storage backend and run
    match config.database_url.clone() {
        Some(url) => {
            tracing::info!("using PostgreSQL record store and event channel");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await?;

            let store = PostgresRecordStore::new(pool.clone());
            store.run_migrations().await?;
            let channel = PostgresEventChannel::with_visibility_timeout(
                pool,
                config.visibility_timeout,
            );

            serve(config, store, channel, metrics_handle).await
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory record store and event channel");
            let store = InMemoryRecordStore::new();
            let channel = InMemoryEventChannel::with_visibility_timeout(config.visibility_timeout);

            serve(config, store, channel, metrics_handle).await
        }
    }
}
