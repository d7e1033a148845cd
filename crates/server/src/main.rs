mod bootstrap;
mod health;
mod webhook;
mod worker;

use std::time::Duration;

use anyhow::Result;
use herald_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use herald_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.work_queue.downgrade(),
    )
    .await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "herald-server accepting interactions"
    );

    let state = webhook::WebhookState::new(app.verifier.clone(), app.work_queue.clone());
    axum::serve(listener, webhook::router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!(event_name = "system.server.stopping", "herald-server stopping");

    // Serving is done and health only holds a weak handle, so dropping our
    // sender closes the queue; the worker drains what is left and exits,
    // bounded by the shutdown window.
    drop(app.work_queue);
    let _ = tokio::time::timeout(
        Duration::from_secs(app.config.server.graceful_shutdown_secs),
        app.worker,
    )
    .await;

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
