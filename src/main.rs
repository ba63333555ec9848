use std::sync::Arc;
use std::time::Duration;

use shoot_dispatch::api;
use shoot_dispatch::config::Config;
use shoot_dispatch::engine::sweeper::run_expiry_sweeper;
use shoot_dispatch::error::AppError;
use shoot_dispatch::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let http_port = config.http_port;
    let sweep_every = Duration::from_secs(config.sweep_interval_secs);

    let shared_state = Arc::new(AppState::from_config(config)?);
    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_expiry_sweeper(shared_state.lifecycle.clone(), sweep_every));

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
