//! Machine Feed server binary.
//!
//! Wires the Status Store, change listener, simulator and HTTP surface
//! together and runs them until Ctrl-C or SIGTERM.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use machine_feed::adapters::http::{app_router, AppState};
use machine_feed::adapters::{BroadcastHub, PgChangeFeed, PostgresStatusStore};
use machine_feed::application::{ChangeListener, ListenerHealth, Simulator};
use machine_feed::config::{AppConfig, LogFormat, ServerConfig};
use machine_feed::domain::machine::{ChangeDecoder, FloorLayout};
use machine_feed::ports::StatusStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!("Connected to status store");

    let layout = Arc::new(FloorLayout::default_floor());
    let hub = Arc::new(BroadcastHub::new(config.broadcast.hub_config()));
    let store: Arc<dyn StatusStore> = Arc::new(PostgresStatusStore::new(
        pool.clone(),
        &config.database.status_table,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let health = ListenerHealth::new();
    let listener = ChangeListener::new(
        Arc::new(PgChangeFeed::new(pool.clone(), &config.database.notify_channel)),
        ChangeDecoder::new(&config.database.status_table),
        hub.clone(),
        health.clone(),
        config.listener.backoff(),
    );
    let listener_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { listener.run(shutdown).await }
    });

    let simulator_task = if config.simulator.enabled {
        let simulator = Simulator::new(store.clone(), layout.clone(), config.simulator.settings())?;
        Some(tokio::spawn(simulator.run(shutdown_rx.clone())))
    } else {
        tracing::info!("Simulator disabled");
        None
    };

    let state = AppState {
        hub: hub.clone(),
        store,
        layout,
        listener: health,
        simulator_enabled: config.simulator.enabled,
        send_timeout: config.broadcast.send_timeout(),
    };
    let cors_origins = config.server.cors_origins_list();
    let app = app_router(state, cors_origins.as_deref());

    let addr = config.server.socket_addr()?;
    let tcp = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    let server = axum::serve(tcp, app).with_graceful_shutdown({
        let hub = hub.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
            // Open sockets keep the server from draining until they close.
            hub.close_all().await;
        }
    });
    server.await?;

    if let Err(e) = listener_task.await {
        tracing::warn!(error = %e, "Change listener task ended abnormally");
    }
    if let Some(task) = simulator_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Simulator task ended abnormally");
        }
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match server.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
