//! bulkmail service binary.

use std::sync::Arc;

use bulkmail::http::{router, AppState};
use bulkmail::store::FileBackend;
use bulkmail::transport::Dispatcher;
use bulkmail::{Config, Dashboard};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    let backend = Arc::new(FileBackend::new(&config.data_dir));
    let mut dashboard = Dashboard::open(backend)?;
    dashboard.rehydrate()?;

    let transport = Arc::new(Dispatcher::from_config(&config));
    let state = AppState::new(dashboard, transport, config.throttle());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        "bulkmail listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
